//! Fenced code block extraction from chat responses.

/// A fenced code block found in a markdown response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Info string after the opening fence (e.g. `rust`), if any
    pub language: Option<String>,
    pub lines: Vec<String>,
}

fn opening_fence(line: &str) -> Option<char> {
    let trimmed = line.trim_start();
    ['`', '~']
        .into_iter()
        .find(|&c| trimmed.chars().take(3).filter(|&ch| ch == c).count() == 3)
}

fn is_closing_fence(line: &str, fence: char) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == fence)
}

/// Extracts every fenced block. An unterminated fence runs to the end of the text.
pub fn code_blocks(markdown: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<(char, CodeBlock)> = None;

    for line in markdown.lines() {
        match current.take() {
            None => {
                if let Some(fence) = opening_fence(line) {
                    let info = line.trim().trim_start_matches(fence).trim();
                    let language = (!info.is_empty()).then(|| info.to_string());
                    current = Some((
                        fence,
                        CodeBlock {
                            language,
                            lines: Vec::new(),
                        },
                    ));
                }
            }
            Some((fence, mut block)) => {
                if is_closing_fence(line, fence) {
                    blocks.push(block);
                } else {
                    block.lines.push(line.to_string());
                    current = Some((fence, block));
                }
            }
        }
    }

    if let Some((_, block)) = current {
        blocks.push(block);
    }
    blocks
}

/// All lines inside fenced blocks, in order.
pub fn code_block_lines(markdown: &str) -> Vec<String> {
    code_blocks(markdown)
        .into_iter()
        .flat_map(|block| block.lines)
        .collect()
}
