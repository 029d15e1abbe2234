// 抽出テキストの段落分割

use std::sync::LazyLock;

use regex::Regex;

use crate::error::TransformError;

/// 1段落の目安となる最大文字数。
pub const PARAGRAPH_CHAR_LIMIT: usize = 800;

struct Patterns {
    blank_line: Regex,
    sentence_end: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Patterns {
            blank_line: Regex::new(r"\n[ \t\r\f\v]*\n")?,
            sentence_end: Regex::new(r"\.\s*[A-Z]")?,
        })
    }
}

static PATTERNS: LazyLock<Result<Patterns, regex::Error>> = LazyLock::new(Patterns::compile);

fn patterns() -> crate::error::Result<&'static Patterns> {
    PATTERNS
        .as_ref()
        .map_err(|e| TransformError::word(format!("invalid segmentation pattern: {e}")))
}

/// 制御文字を除去し、連続空白を1つにまとめる。
pub fn clean(text: &str) -> String {
    let visible: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect();
    visible.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `.` の直後（空白を挟んでもよい）に大文字が続く位置で文に分割する。
pub fn split_sentences(text: &str) -> crate::error::Result<Vec<String>> {
    let mut sentences = Vec::new();
    let mut last = 0;
    for m in patterns()?.sentence_end.find_iter(text) {
        let cut = m.start() + 1;
        let sentence = text[last..cut].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        // 大文字はASCIIなので1バイト
        last = m.end() - 1;
    }
    let tail = text[last..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    Ok(sentences)
}

/// 文を上限未満のブロックに貪欲にまとめる。
pub fn merge_sentences(sentences: &[String], limit: usize) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();
    for sentence in sentences {
        let projected = current.chars().count() + 1 + sentence.chars().count();
        if !current.is_empty() && projected >= limit {
            blocks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// テキストを段落に分割する。
///
/// まず空行で区切り、1ブロックしか得られずそれが上限を超える場合は文単位に
/// 分割してから上限未満にまとめ直す。
pub fn segment(text: &str) -> crate::error::Result<Vec<String>> {
    let normalized = text.replace("\r\n", "\n");
    let blocks: Vec<&str> = patterns()?
        .blank_line
        .split(&normalized)
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .collect();

    let raw: Vec<String> = match blocks.as_slice() {
        [single] if single.chars().count() > PARAGRAPH_CHAR_LIMIT => {
            merge_sentences(&split_sentences(&clean(single))?, PARAGRAPH_CHAR_LIMIT)
        }
        _ => blocks.iter().map(|b| b.to_string()).collect(),
    };

    Ok(raw
        .iter()
        .map(|b| clean(b))
        .filter(|b| !b.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_blank_lines() {
        let text = "First para\nline two\n\n  \nSecond para\r\n\r\nThird";
        assert_eq!(
            segment(text).unwrap(),
            vec!["First para line two", "Second para", "Third"]
        );
    }

    #[test]
    fn sentence_split_requires_capital() {
        let s = split_sentences("One. Two.three. Four").unwrap();
        assert_eq!(s, vec!["One.", "Two.three.", "Four"]);
    }

    #[test]
    fn oversized_single_block_is_reflowed() {
        let sentence = "This sentence is exactly fifty characters long ok.";
        let text = vec![sentence; 40].join(" ");
        let paragraphs = segment(&text).unwrap();
        assert!(paragraphs.len() > 1);
        for p in &paragraphs {
            assert!(p.chars().count() < PARAGRAPH_CHAR_LIMIT);
        }
        // 1文1段落にはならない
        assert!(paragraphs.len() < 40);
        let total: usize = paragraphs.iter().map(|p| p.matches("ok.").count()).sum();
        assert_eq!(total, 40);
    }

    #[test]
    fn strips_control_characters() {
        assert_eq!(clean("a\u{0}b\u{7}  c\td"), "ab c d");
    }
}
