//! # Divisor de Blocos
//!
//! Uma colagem contém vários agendamentos em sequência. Cada agendamento
//! começa numa linha `Horário:`, que funciona como âncora:
//!
//! ```text
//! Agenda de hoje              ← descartado (antes da primeira âncora)
//! Horário: 08:00 - 09:00      ┐
//! Paciente: Maria             │ bloco 0
//! Status: Presença confirmada ┘
//! Horário: 09:00 - 10:00      ┐
//! Paciente: João              │ bloco 1
//! Status: Faltou              ┘
//! ```

use regex::Regex;

/// Texto cru de um agendamento.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Posição do bloco na colagem (0-based).
    pub index: usize,
    /// Linhas do bloco, a primeira é sempre a âncora `Horário:`.
    pub lines: Vec<String>,
}

impl Block {
    /// Texto do bloco com as linhas unidas por `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Divide a colagem em blocos pela âncora `Horário:`.
pub struct BlockSplitter {
    anchor: Regex,
}

impl BlockSplitter {
    pub fn new() -> Self {
        Self {
            anchor: Regex::new(r"(?i)^\s*hor[áa]rio\s*:").unwrap(),
        }
    }

    /// `true` se a linha abre um novo bloco.
    pub fn is_anchor(&self, line: &str) -> bool {
        self.anchor.is_match(line)
    }

    /// Divide o texto em blocos. Linhas antes da primeira âncora e linhas
    /// vazias são ignoradas.
    pub fn split(&self, text: &str) -> Vec<Block> {
        let mut blocks: Vec<Block> = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if self.is_anchor(line) {
                blocks.push(Block {
                    index: blocks.len(),
                    lines: vec![line.to_string()],
                });
            } else if let Some(current) = blocks.last_mut() {
                current.lines.push(line.to_string());
            }
        }

        blocks
    }
}

impl Default for BlockSplitter {
    fn default() -> Self {
        Self::new()
    }
}
