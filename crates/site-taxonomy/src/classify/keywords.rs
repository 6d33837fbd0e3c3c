//! Fixed keyword taxonomy used when the ontology has little to say.

use regex::Regex;

/// Category name and its representative keywords, in tie-break order.
pub const PREDEFINED_TAXONOMY: &[(&str, &[&str])] = &[
    ("About", &["about", "who we are", "history", "mission"]),
    ("News", &["news", "press", "bulletin", "announc"]),
    ("Events", &["event", "calendar", "schedule", "program"]),
    (
        "Institutions",
        &["school", "college", "institute", "home", "parish"],
    ),
    ("Projects", &["project", "initiative", "program"]),
    ("Contact", &["contact", "address", "phone", "email"]),
    ("Media", &["gallery", "photo", "video", "multimedia"]),
    (
        "Leadership",
        &["rector", "principal", "director", "staff", "leadership"],
    ),
    ("Admissions", &["admission", "apply", "fees", "enroll"]),
];

#[derive(Debug, Clone)]
struct KeywordCategory {
    name: &'static str,
    keywords: Vec<Regex>,
}

/// The predefined catalogue with every keyword compiled once.
#[derive(Debug, Clone)]
pub struct KeywordTaxonomy {
    categories: Vec<KeywordCategory>,
}

impl Default for KeywordTaxonomy {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordTaxonomy {
    pub fn new() -> Self {
        let categories = PREDEFINED_TAXONOMY
            .iter()
            .map(|&(name, keywords)| KeywordCategory {
                name,
                keywords: keywords
                    .iter()
                    .filter_map(|kw| {
                        Regex::new(&format!(r"(?i)\b{}\b", regex::escape(kw))).ok()
                    })
                    .collect(),
            })
            .collect();
        Self { categories }
    }

    /// Category names in catalogue order.
    pub fn names(&self) -> Vec<&'static str> {
        self.categories.iter().map(|c| c.name).collect()
    }

    /// Best category and its share of all keyword hits.
    ///
    /// Returns `None` when no keyword occurs at all. The earliest category
    /// in catalogue order wins ties.
    pub fn classify(&self, text: &str) -> Option<(&'static str, f32)> {
        let scores: Vec<(&'static str, usize)> = self
            .categories
            .iter()
            .map(|c| {
                let hits = c.keywords.iter().map(|re| re.find_iter(text).count()).sum::<usize>();
                (c.name, hits)
            })
            .collect();

        let total: usize = scores.iter().map(|(_, hits)| hits).sum();
        if total == 0 {
            return None;
        }

        let (name, best) = scores
            .into_iter()
            .fold(("", 0), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            });
        Some((name, best as f32 / total as f32))
    }
}
