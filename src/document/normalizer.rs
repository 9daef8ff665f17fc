// file: src/document/normalizer.rs
// description: plain text normalization ahead of chunking
// reference: line-oriented cleanup passes

pub struct TextNormalizer;

impl TextNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, content: &str) -> String {
        let mut normalized = self.normalize_line_endings(content);

        normalized = self.normalize_lists(&normalized);
        normalized = self.normalize_line_breaks(&normalized);
        normalized = self.strip_control_chars(&normalized);

        normalized.trim().to_string()
    }

    fn normalize_line_endings(&self, content: &str) -> String {
        content.replace("\r\n", "\n").replace('\r', "\n")
    }

    fn normalize_lists(&self, content: &str) -> String {
        let lines: Vec<&str> = content.lines().collect();
        let mut result = Vec::new();

        for line in lines {
            let trimmed = line.trim_start();

            if let Some(stripped) = trimmed
                .strip_prefix("* ")
                .or_else(|| trimmed.strip_prefix("• "))
                .or_else(|| trimmed.strip_prefix("+ "))
            {
                let indent = line.len() - trimmed.len();
                result.push(format!("{}- {}", " ".repeat(indent), stripped.trim()));
            } else {
                result.push(line.to_string());
            }
        }

        result.join("\n")
    }

    fn normalize_line_breaks(&self, content: &str) -> String {
        let mut result = Vec::new();
        let mut blank_run = 0;

        for line in content.lines().map(str::trim_end) {
            if line.is_empty() {
                blank_run += 1;
                if blank_run > 1 {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            result.push(line);
        }

        result.join("\n")
    }

    fn strip_control_chars(&self, content: &str) -> String {
        content
            .chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
