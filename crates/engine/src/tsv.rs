use ocr_models::{BoundingBox, OcrError};

const WORD_LEVEL: u32 = 5;
const COLUMNS: [&str; 12] = [
    "level", "page_num", "block_num", "par_num", "line_num", "word_num", "left", "top", "width",
    "height", "conf", "text",
];

/// One word row of tesseract's TSV output.
#[derive(Clone, Debug, PartialEq)]
pub struct RecognizedWord {
    pub block_num: u32,
    pub par_num: u32,
    pub line_num: u32,
    pub word_num: u32,
    pub bbox: BoundingBox,
    /// Engine confidence, 0-100.
    pub confidence: f64,
    pub text: String,
}

impl RecognizedWord {
    pub fn line_key(&self) -> (u32, u32, u32) {
        (self.block_num, self.par_num, self.line_num)
    }

    pub fn paragraph_key(&self) -> (u32, u32) {
        (self.block_num, self.par_num)
    }
}

fn malformed(line_no: usize, what: &str) -> OcrError {
    OcrError::EngineFailure {
        reason: format!("malformed TSV output at line {line_no}: {what}"),
    }
}

fn field<T: std::str::FromStr>(cols: &[&str], idx: usize, line_no: usize) -> Result<T, OcrError> {
    cols.get(idx)
        .ok_or_else(|| malformed(line_no, "missing column"))?
        .trim()
        .parse()
        .map_err(|_| malformed(line_no, COLUMNS[idx]))
}

/// Parses `tesseract ... tsv` output, keeping word rows with text and a
/// non-negative confidence, in output order.
pub fn parse_tsv(output: &str) -> Result<Vec<RecognizedWord>, OcrError> {
    let mut words = Vec::new();
    let mut lines = output.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

    match lines.next() {
        None => return Ok(words),
        Some((_, header)) => {
            let found: Vec<&str> = header.split('\t').map(str::trim).collect();
            if found.first() != Some(&"level") || found.len() < COLUMNS.len() - 1 {
                return Err(malformed(1, "missing header"));
            }
        }
    }

    for (idx, line) in lines {
        let line_no = idx + 1;
        let cols: Vec<&str> = line.splitn(COLUMNS.len(), '\t').collect();
        let level: u32 = field(&cols, 0, line_no)?;
        if level != WORD_LEVEL {
            continue;
        }
        let confidence: f64 = field(&cols, 10, line_no)?;
        let text = cols.get(11).map(|t| t.trim()).unwrap_or_default();
        if confidence < 0.0 || text.is_empty() {
            continue;
        }
        words.push(RecognizedWord {
            block_num: field(&cols, 2, line_no)?,
            par_num: field(&cols, 3, line_no)?,
            line_num: field(&cols, 4, line_no)?,
            word_num: field(&cols, 5, line_no)?,
            bbox: BoundingBox {
                x: field(&cols, 6, line_no)?,
                y: field(&cols, 7, line_no)?,
                width: field(&cols, 8, line_no)?,
                height: field(&cols, 9, line_no)?,
            },
            confidence: confidence.clamp(0.0, 100.0),
            text: text.to_string(),
        });
    }

    Ok(words)
}
