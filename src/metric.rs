use super::Record;

/// The measured quantities, one subplot each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Pagefaults,
    Diskwrites,
    Diskreads,
}

impl Metric {
    /// all metrics in the order the subplots are laid out
    pub const ALL: [Metric; 3] = [Metric::Pagefaults, Metric::Diskwrites, Metric::Diskreads];

    /// column name in the csv header
    pub fn name(self) -> &'static str {
        match self {
            Metric::Pagefaults => "pagefaults",
            Metric::Diskwrites => "diskwrites",
            Metric::Diskreads => "diskreads",
        }
    }

    /// capitalized name, used for the subplot caption and the y label
    pub fn title(self) -> &'static str {
        match self {
            Metric::Pagefaults => "Pagefaults",
            Metric::Diskwrites => "Diskwrites",
            Metric::Diskreads => "Diskreads",
        }
    }

    pub fn value(self, record: &Record) -> f64 {
        match self {
            Metric::Pagefaults => record.pagefaults,
            Metric::Diskwrites => record.diskwrites,
            Metric::Diskreads => record.diskreads,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
