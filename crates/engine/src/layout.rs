use ocr_models::{BlockLevel, TextBlock};

use crate::RecognizedWord;

/// Text, confidence and blocks derived from a page of recognized words.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub text: String,
    pub confidence: f64,
    pub blocks: Vec<TextBlock>,
}

fn group_key(word: &RecognizedWord, level: BlockLevel) -> (u32, u32, u32, u32) {
    match level {
        BlockLevel::Word => (word.block_num, word.par_num, word.line_num, word.word_num),
        BlockLevel::Line => (word.block_num, word.par_num, word.line_num, 0),
        BlockLevel::Paragraph => (word.block_num, word.par_num, 0, 0),
        BlockLevel::Block => (word.block_num, 0, 0, 0),
    }
}

/// Joins words: same line by a space, new line by `\n`, new paragraph or block
/// by a blank line.
pub fn join_words<'a>(words: impl IntoIterator<Item = &'a RecognizedWord>) -> String {
    let mut out = String::new();
    let mut prev: Option<&RecognizedWord> = None;
    for word in words {
        if let Some(p) = prev {
            if p.paragraph_key() != word.paragraph_key() {
                out.push_str("\n\n");
            } else if p.line_key() != word.line_key() {
                out.push('\n');
            } else {
                out.push(' ');
            }
        }
        out.push_str(&word.text);
        prev = Some(word);
    }
    out
}

fn mean_confidence(words: &[&RecognizedWord]) -> f64 {
    if words.is_empty() {
        return 0.0;
    }
    let sum: f64 = words.iter().map(|w| w.confidence).sum();
    (sum / words.len() as f64 / 100.0).clamp(0.0, 1.0)
}

/// Character-weighted mean confidence over all words, in [0,1].
pub fn overall_confidence(words: &[RecognizedWord]) -> f64 {
    let (weighted, chars) = words.iter().fold((0.0, 0usize), |(acc, n), w| {
        let len = w.text.chars().count();
        (acc + w.confidence * len as f64, n + len)
    });
    if chars == 0 {
        return 0.0;
    }
    (weighted / chars as f64 / 100.0).clamp(0.0, 1.0)
}

/// Groups words into blocks of `level`, with boxes shifted by `origin` so they
/// are expressed in source-image coordinates.
pub fn assemble(words: &[RecognizedWord], level: BlockLevel, origin: (u32, u32)) -> Layout {
    let mut groups: Vec<Vec<&RecognizedWord>> = Vec::new();
    for word in words {
        match groups.last_mut() {
            Some(group) if group_key(group[0], level) == group_key(word, level) => group.push(word),
            _ => groups.push(vec![word]),
        }
    }

    let blocks = groups
        .iter()
        .map(|group| {
            let bbox = group[1..]
                .iter()
                .fold(group[0].bbox, |acc, w| acc.union(&w.bbox))
                .translate(origin.0, origin.1);
            TextBlock {
                text: join_words(group.iter().copied()),
                confidence: mean_confidence(group),
                level,
                bbox,
            }
        })
        .collect();

    Layout {
        text: join_words(words).trim().to_string(),
        confidence: overall_confidence(words),
        blocks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocr_models::BoundingBox;

    fn word(block: u32, par: u32, line: u32, n: u32, x: u32, conf: f64, text: &str) -> RecognizedWord {
        RecognizedWord {
            block_num: block,
            par_num: par,
            line_num: line,
            word_num: n,
            bbox: BoundingBox {
                x,
                y: line * 20,
                width: 10,
                height: 10,
            },
            confidence: conf,
            text: text.to_string(),
        }
    }

    fn page() -> Vec<RecognizedWord> {
        vec![
            word(1, 1, 1, 1, 0, 90.0, "Hello"),
            word(1, 1, 1, 2, 20, 80.0, "big"),
            word(1, 1, 2, 1, 0, 100.0, "world"),
            word(2, 1, 1, 1, 0, 50.0, "Bye"),
        ]
    }

    #[test]
    fn joins_lines_and_paragraphs() {
        let layout = assemble(&page(), BlockLevel::Line, (0, 0));
        assert_eq!(layout.text, "Hello big\nworld\n\nBye");
    }

    #[test]
    fn groups_by_requested_level() {
        let words = page();
        assert_eq!(assemble(&words, BlockLevel::Word, (0, 0)).blocks.len(), 4);
        assert_eq!(assemble(&words, BlockLevel::Line, (0, 0)).blocks.len(), 3);
        assert_eq!(assemble(&words, BlockLevel::Paragraph, (0, 0)).blocks.len(), 2);
        assert_eq!(assemble(&words, BlockLevel::Block, (0, 0)).blocks.len(), 2);

        let paragraphs = assemble(&words, BlockLevel::Paragraph, (0, 0));
        assert_eq!(paragraphs.blocks[0].text, "Hello big\nworld");
        assert_eq!(paragraphs.blocks[0].level, BlockLevel::Paragraph);
    }

    #[test]
    fn block_boxes_are_unions_in_source_coordinates() {
        let layout = assemble(&page(), BlockLevel::Line, (100, 50));
        let first = &layout.blocks[0];
        assert_eq!(
            first.bbox,
            BoundingBox {
                x: 100,
                y: 70,
                width: 30,
                height: 10
            }
        );
        assert!((first.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn overall_confidence_is_character_weighted() {
        let words = vec![
            word(1, 1, 1, 1, 0, 100.0, "aaaa"),
            word(1, 1, 1, 2, 10, 0.0, "b"),
        ];
        assert!((overall_confidence(&words) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn no_words_means_empty_result() {
        let layout = assemble(&[], BlockLevel::Line, (0, 0));
        assert_eq!(layout.text, "");
        assert_eq!(layout.confidence, 0.0);
        assert!(layout.blocks.is_empty());
    }
}
