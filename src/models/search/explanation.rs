use std::fmt;

/// Why a document scored what it scored, as a tree of factors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Explanation {
    value: f32,
    is_match: bool,
    description: String,
    details: Vec<Explanation>,
}

impl Explanation {
    /// A factor of a score.
    pub fn new<T: Into<String>>(value: f32, description: T) -> Self {
        Self {
            value,
            is_match: true,
            description: description.into(),
            details: vec![],
        }
    }

    /// A document that does not match at all.
    pub fn no_match<T: Into<String>>(description: T) -> Self {
        Self {
            value: 0.0,
            is_match: false,
            description: description.into(),
            details: vec![],
        }
    }

    pub fn with_detail(mut self, detail: Explanation) -> Self {
        self.details.push(detail);
        self
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_match(&self) -> bool {
        self.is_match
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn details(&self) -> &[Explanation] {
        &self.details
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(
            f,
            "{:indent$}{} = {}",
            "",
            self.value,
            self.description,
            indent = depth * 2
        )?;
        for d in self.details.iter() {
            d.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = Explanation::new(0.5, "q, product of:")
            .with_detail(Explanation::new(2.0, "boost"))
            .with_detail(Explanation::new(0.25, "queryNorm"));
        assert!(e.is_match());
        assert_eq!(e.details().len(), 2);
        assert_eq!(
            e.to_string(),
            "0.5 = q, product of:\n  2 = boost\n  0.25 = queryNorm\n"
        );

        let n = Explanation::no_match("q doesn't match id 3");
        assert!(!n.is_match());
        assert_eq!(n.value(), 0.0);
        assert_eq!(n.description(), "q doesn't match id 3");
    }
}
