use std::fmt;

/// Tree describing how a score was computed.
#[derive(Debug, Clone)]
pub struct Explanation {
    value: f32,
    description: String,
    details: Vec<Explanation>,
}

impl Explanation {
    pub fn new<D: Into<String>>(value: f32, description: D) -> Explanation {
        Explanation {
            value,
            description: description.into(),
            details: Vec::new(),
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn details(&self) -> &[Explanation] {
        &self.details
    }

    pub fn add_detail(&mut self, detail: Explanation) {
        self.details.push(detail);
    }

    /// A match is any explanation with a positive value.
    pub fn is_match(&self) -> bool {
        self.value > 0.0
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{}{} = {}", "  ".repeat(depth), self.value, self.description)?;
        for detail in &self.details {
            detail.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::Explanation;

    #[test]
    fn test_display_tree() {
        let mut root = Explanation::new(6.0, "product of:");
        root.add_detail(Explanation::new(2.0, "tf"));
        root.add_detail(Explanation::new(3.0, "idf"));
        let rendered = root.to_string();
        assert!(rendered.contains("6 = product of:"));
        assert!(rendered.contains("  2 = tf"));
        assert!(root.is_match());
    }
}
