/// Free-text problem buffer. Validation happens at submit time, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    buffer: String,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// True when the buffer holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.buffer.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_detection() {
        let mut input = TextInput::new();
        assert!(input.is_blank());

        input.set("   \t\n");
        assert!(input.is_blank());

        input.set(" 2x = 4 ");
        assert!(!input.is_blank());
        assert_eq!(input.as_str(), " 2x = 4 ");

        input.clear();
        assert_eq!(input.as_str(), "");
    }
}
