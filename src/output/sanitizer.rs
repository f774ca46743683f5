//! Plain-text rendering of raw terminal output.

use vte::{Params, Parser, Perform};

/// Render raw PTY bytes as plain text.
///
/// Escape sequences are dropped, `\r\n` becomes `\n`, a bare carriage
/// return rewinds to the start of the line so progress-style redraws keep
/// only their last frame, and backspace erases the previous character.
pub fn plain_text(raw: &[u8]) -> String {
    let mut renderer = LineRenderer::default();
    let mut parser = Parser::new();
    parser.advance(&mut renderer, raw);
    renderer.finish()
}

#[derive(Default)]
struct LineRenderer {
    done: Vec<String>,
    line: String,
    rewound: bool,
}

impl LineRenderer {
    fn finish(mut self) -> String {
        self.done.push(self.line);
        self.done.join("\n")
    }

    fn write(&mut self, c: char) {
        if self.rewound {
            self.line.clear();
            self.rewound = false;
        }
        self.line.push(c);
    }
}

impl Perform for LineRenderer {
    fn print(&mut self, c: char) {
        self.write(c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' => {
                self.done.push(std::mem::take(&mut self.line));
                self.rewound = false;
            }
            b'\r' => self.rewound = true,
            b'\t' => self.write('\t'),
            0x08 => {
                if !self.rewound {
                    self.line.pop();
                }
            }
            _ => {}
        }
    }

    fn csi_dispatch(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, action: char) {
        // erase-line after a rewind clears what was there
        if action == 'K' && self.rewound {
            self.line.clear();
        }
    }
}
