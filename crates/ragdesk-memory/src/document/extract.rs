//! Heuristic structure extraction over plain page text.

use super::types::{KeyValues, Table};

/// Collect `key: value` pairs, one candidate per line.
///
/// Each line is split at its first `:`; both sides are trimmed and the pair is
/// kept only when neither side is empty. Later duplicates overwrite earlier ones.
#[must_use]
pub fn extract_key_values(text: &str) -> KeyValues {
    let mut pairs = KeyValues::new();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        pairs.insert(key.to_owned(), value.to_owned());
    }
    pairs
}

/// Detect column-aligned tables in page text.
///
/// A line is a row candidate when it splits on tabs or runs of two or more
/// spaces into at least two non-empty cells. Maximal runs of two or more
/// consecutive candidates with the same cell count form one table.
#[must_use]
pub fn detect_tables(text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut run: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        match split_cells(line) {
            Some(cells) if run.last().is_none_or(|prev| prev.len() == cells.len()) => {
                run.push(cells);
            }
            Some(cells) => {
                flush_run(&mut run, &mut tables);
                run.push(cells);
            }
            None => flush_run(&mut run, &mut tables),
        }
    }
    flush_run(&mut run, &mut tables);
    tables
}

fn flush_run(run: &mut Vec<Vec<String>>, tables: &mut Vec<Table>) {
    if run.len() >= 2 {
        tables.push(Table::new(std::mem::take(run)));
    } else {
        run.clear();
    }
}

fn split_cells(line: &str) -> Option<Vec<String>> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut spaces = 0usize;

    for ch in line.trim().chars() {
        match ch {
            '\t' => {
                push_cell(&mut cells, &mut current);
                spaces = 0;
            }
            ' ' => spaces += 1,
            _ => {
                if spaces >= 2 {
                    push_cell(&mut cells, &mut current);
                } else if spaces == 1 {
                    current.push(' ');
                }
                spaces = 0;
                current.push(ch);
            }
        }
    }
    push_cell(&mut cells, &mut current);

    (cells.len() >= 2).then_some(cells)
}

fn push_cell(cells: &mut Vec<String>, current: &mut String) {
    let cell = current.trim();
    if !cell.is_empty() {
        cells.push(cell.to_owned());
    }
    current.clear();
}
