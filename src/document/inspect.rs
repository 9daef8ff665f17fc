// file: src/document/inspect.rs
// description: quick content checks that become processing notes
// reference: precompiled regex patterns with lazy_static

use lazy_static::lazy_static;
use regex::Regex;

/// Below this many characters the analysis is likely to be thin.
pub const MIN_CONTENT_CHARS: usize = 100;

pub const TENDER_KEYWORDS: [&str; 16] = [
    "招标",
    "投标",
    "采购",
    "评标",
    "开标",
    "中标",
    "招标文件",
    "评分标准",
    "tender",
    "bid",
    "bidder",
    "procurement",
    "bid opening",
    "evaluation",
    "award",
    "purchaser",
];

const SECTION_TITLES: [&str; 8] = [
    "招标公告",
    "投标人须知",
    "评标办法",
    "合同条款",
    "技术规格",
    "商务要求",
    "资格审查",
    "评分标准",
];

lazy_static! {
    static ref HEADING_PATTERN: Regex = Regex::new(
        r"(?i)^(第[一二三四五六七八九十百零\d]+[章节部分]|[一二三四五六七八九十]+、|（[一二三四五六七八九十]+）|\d{1,2}\.(\s|\S)|chapter\s+\d+|section\s+\d+|part\s+[ivx\d]+)"
    )
    .expect("HEADING_PATTERN regex is valid");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInspection {
    pub char_count: usize,
    pub keywords_found: Vec<&'static str>,
    pub structure_lines: usize,
}

impl DocumentInspection {
    pub fn is_short(&self) -> bool {
        self.char_count < MIN_CONTENT_CHARS
    }

    /// Notes appended to the result during preprocessing.
    pub fn notes(&self) -> Vec<String> {
        let mut notes = Vec::new();

        if self.is_short() {
            notes.push(format!(
                "Document content is short ({} characters); analysis quality may suffer",
                self.char_count
            ));
        }

        if self.keywords_found.is_empty() {
            notes.push(
                "No tender-related keywords found; please confirm the document type".to_string(),
            );
        }

        if self.structure_lines > 0 {
            notes.push(format!(
                "Found {} possible chapter structure lines",
                self.structure_lines
            ));
        }

        notes
    }
}

pub fn inspect(text: &str) -> DocumentInspection {
    let lowered = text.to_lowercase();
    let keywords_found = TENDER_KEYWORDS
        .iter()
        .copied()
        .filter(|keyword| lowered.contains(keyword))
        .collect();

    let structure_lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            HEADING_PATTERN.is_match(line) || SECTION_TITLES.iter().any(|t| line.contains(t))
        })
        .count();

    DocumentInspection {
        char_count: text.chars().count(),
        keywords_found,
        structure_lines,
    }
}
