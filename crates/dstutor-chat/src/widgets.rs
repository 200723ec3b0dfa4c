//! Static learning aids: comparison tables, diagrams and preset questions.

use serde::Serialize;

/// Preset questions offered as one-click prompts
pub const QUICK_QUESTIONS: [&str; 4] = [
    "What is overfitting in ML?",
    "Explain bias-variance tradeoff.",
    "Types of regression?",
    "Supervised vs. Unsupervised learning?",
];

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonTable {
    pub name: &'static str,
    pub headers: &'static [&'static str],
    pub rows: &'static [&'static [&'static str]],
}

impl ComparisonTable {
    pub fn to_markdown(&self) -> String {
        let mut out = format!("| {} |\n", self.headers.join(" | "));
        out.push_str(&format!("|{}\n", "---|".repeat(self.headers.len())));
        for row in self.rows {
            out.push_str(&format!("| {} |\n", row.join(" | ")));
        }
        out
    }
}

static TABLES: [ComparisonTable; 2] = [
    ComparisonTable {
        name: "ML Models",
        headers: &["Model", "Accuracy", "Training Time"],
        rows: &[
            &["Linear Regression", "85", "Fast"],
            &["Decision Tree", "78", "Medium"],
            &["SVM", "82", "Slow"],
        ],
    },
    ComparisonTable {
        name: "Algorithms",
        headers: &["Algorithm", "Scalability", "Use Case"],
        rows: &[
            &["K-Means", "High", "Clustering"],
            &["DBSCAN", "Medium", "Anomaly Detection"],
            &["Hierarchical", "Low", "Dendrogram Analysis"],
        ],
    },
];

/// A diagram as Graphviz DOT source
#[derive(Debug, Clone, Serialize)]
pub struct Diagram {
    pub name: &'static str,
    pub dot: &'static str,
}

static DIAGRAMS: [Diagram; 3] = [
    Diagram {
        name: "Decision Tree",
        dot: "digraph G {A -> B; A -> C;}",
    },
    Diagram {
        name: "Neural Network",
        dot: "digraph G {A -> B; B -> C; C -> D;}",
    },
    Diagram {
        name: "K-Means Clustering",
        dot: "digraph G {Cluster1 -> Point1; Cluster1 -> Point2; Cluster2 -> Point3;}",
    },
];

fn same_name(a: &str, b: &str) -> bool {
    let squash = |s: &str| {
        s.chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect::<String>()
    };
    squash(a) == squash(b)
}

pub fn comparison_tables() -> &'static [ComparisonTable] {
    &TABLES
}

/// Look a table up by name, ignoring case, spaces and dashes
pub fn comparison_table(name: &str) -> Option<&'static ComparisonTable> {
    TABLES.iter().find(|t| same_name(t.name, name))
}

pub fn diagrams() -> &'static [Diagram] {
    &DIAGRAMS
}

/// Look a diagram up by name, ignoring case, spaces and dashes
pub fn diagram(name: &str) -> Option<&'static Diagram> {
    DIAGRAMS.iter().find(|d| same_name(d.name, name))
}

/// 1-based lookup, the numbering the REPL shows
pub fn quick_question(number: usize) -> Option<&'static str> {
    number.checked_sub(1).and_then(|i| QUICK_QUESTIONS.get(i)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ml_models_markdown() {
        let table = comparison_table("ML Models").unwrap();
        assert_eq!(
            table.to_markdown(),
            "| Model | Accuracy | Training Time |\n\
             |---|---|---|\n\
             | Linear Regression | 85 | Fast |\n\
             | Decision Tree | 78 | Medium |\n\
             | SVM | 82 | Slow |\n"
        );
    }

    #[test]
    fn test_lookup_is_forgiving() {
        assert_eq!(comparison_table("ml-models").map(|t| t.name), Some("ML Models"));
        assert_eq!(diagram("k-means clustering").map(|d| d.name), Some("K-Means Clustering"));
        assert_eq!(diagram("neuralnetwork").map(|d| d.name), Some("Neural Network"));
        assert!(comparison_table("Regression").is_none());
    }

    #[test]
    fn test_quick_question_numbering() {
        assert_eq!(quick_question(1), Some("What is overfitting in ML?"));
        assert_eq!(quick_question(4), Some("Supervised vs. Unsupervised learning?"));
        assert_eq!(quick_question(0), None);
        assert_eq!(quick_question(5), None);
    }
}
