use crate::labels::LabelSet;

/// Document field holding a photo's labels.
pub const LABELS_FIELD: &str = "labels";

const OR_OPERATOR: &str = " OR ";

/// Edit-distance tolerance applied to each query term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fuzziness {
    /// Scales with term length: exact for 1-2 chars, one edit for 3-5, two beyond.
    Auto,
}

impl Fuzziness {
    pub fn max_edits(&self, term: &str) -> u8 {
        match self {
            Fuzziness::Auto => match term.chars().count() {
                0..=2 => 0,
                3..=5 => 1,
                _ => 2,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Fuzziness::Auto => "AUTO",
        }
    }
}

/// A fuzzy, disjunctive match over the labels field.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    field: &'static str,
    terms: Vec<String>,
    fuzziness: Fuzziness,
    size: usize,
}

impl Query {
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Search text with an explicit `OR` between every pair of labels.
    pub fn text(&self) -> String {
        self.terms.join(OR_OPERATOR)
    }

    pub fn fuzziness(&self) -> Fuzziness {
        self.fuzziness
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    size: usize,
}

impl QueryBuilder {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    /// Returns `None` for an empty label set, which has nothing to search for.
    pub fn build(&self, labels: &LabelSet) -> Option<Query> {
        if labels.is_empty() {
            return None;
        }
        let query = Query {
            field: LABELS_FIELD,
            terms: labels.iter().map(str::to_string).collect(),
            fuzziness: Fuzziness::Auto,
            size: self.size,
        };
        log::debug!("Built query '{}' over field '{}'", query.text(), query.field);
        Some(query)
    }
}
