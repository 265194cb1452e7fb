//! Value-table persistence in a line-oriented text format.
//!
//! One line per solved anchor: `(flag, upper_total, used_mask) value`, with
//! the anchor coordinates as integers and the value as a float. The parser is
//! tolerant about punctuation: parentheses and commas are stripped before
//! splitting, so `0 63 4095 254.59` decodes the same as
//! `(0, 63, 4095) 254.59`. Any anchor absent from the file stays unsolved,
//! which is exactly what [`crate::solver::solve`] needs to resume a partial
//! run from a seed table.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, RangeError};
use crate::rules::{Anchor, YahtzeeFlag, YahtzeeRules};
use crate::solver::ValueTable;

/// Writes every solved entry of `table`, one line per anchor.
pub fn save_values<W: Write>(
    writer: &mut W,
    rules: &YahtzeeRules,
    table: &ValueTable,
) -> Result<(), Error> {
    for index in 0..table.len() {
        let value = match table.get(index) {
            Some(value) => value,
            None => continue,
        };
        let anchor = rules.index_to_anchor(index)?;
        writeln!(
            writer,
            "({}, {}, {}) {}",
            anchor.yahtzee.index(),
            anchor.upper_total,
            anchor.used,
            value
        )?;
    }
    Ok(())
}

/// Reads a (possibly partial) value table; anchors not listed stay unsolved.
/// Blank lines are skipped, duplicate anchors keep the last value seen.
pub fn load_values<R: BufRead>(reader: R, rules: &YahtzeeRules) -> Result<ValueTable, Error> {
    let mut table = ValueTable::new(rules.table_len());
    for line in reader.lines() {
        let line = line?;
        let cleaned: String = line
            .chars()
            .map(|c| if c == '(' || c == ')' || c == ',' { ' ' } else { c })
            .collect();
        let tokens: Vec<&str> = cleaned.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() != 4 {
            return Err(malformed(&line).into());
        }
        let flag_index: usize = tokens[0].parse().map_err(|_| malformed(&line))?;
        let upper_total: i32 = tokens[1].parse().map_err(|_| malformed(&line))?;
        let used: u32 = tokens[2].parse().map_err(|_| malformed(&line))?;
        let value: f64 = tokens[3].parse().map_err(|_| malformed(&line))?;

        let yahtzee = YahtzeeFlag::from_index(flag_index).ok_or_else(|| malformed(&line))?;
        let max = rules.max_anchor();
        if upper_total < 0 || upper_total > max.upper_total || used > max.used {
            return Err(malformed(&line).into());
        }
        let anchor = Anchor {
            yahtzee,
            upper_total,
            used,
        };
        table.set(rules.anchor_to_index(anchor), value);
    }
    Ok(table)
}

/// [`save_values`] to a file path, buffered.
pub fn save_values_to_path<P: AsRef<Path>>(
    path: P,
    rules: &YahtzeeRules,
    table: &ValueTable,
) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    save_values(&mut writer, rules, table)?;
    writer.flush()?;
    Ok(())
}

/// [`load_values`] from a file path, buffered.
pub fn load_values_from_path<P: AsRef<Path>>(
    path: P,
    rules: &YahtzeeRules,
) -> Result<ValueTable, Error> {
    load_values(BufReader::new(File::open(path)?), rules)
}

fn malformed(line: &str) -> RangeError {
    RangeError::Malformed {
        what: "value table line",
        text: line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_solved_entries_only() {
        let rules = YahtzeeRules::standard();
        let mut table = ValueTable::new(rules.table_len());
        let a = Anchor {
            yahtzee: YahtzeeFlag::Unused,
            upper_total: 0,
            used: 0,
        };
        let b = Anchor {
            yahtzee: YahtzeeFlag::Nonzero,
            upper_total: 63,
            used: 0xFFF,
        };
        table.set(rules.anchor_to_index(a), 254.59);
        table.set(rules.anchor_to_index(b), 0.0);

        let mut buf = Vec::new();
        save_values(&mut buf, &rules, &table).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("(0, 0, 0) 254.59"));

        let loaded = load_values(Cursor::new(text), &rules).unwrap();
        assert_eq!(loaded.len(), table.len());
        assert_eq!(loaded.get(rules.anchor_to_index(a)), Some(254.59));
        assert_eq!(loaded.get(rules.anchor_to_index(b)), Some(0.0));
        assert_eq!(loaded.solved_count(), 2);
    }

    #[test]
    fn parser_tolerates_bare_and_decorated_tuples() {
        let rules = YahtzeeRules::standard();
        let text = "\n(2, 63, 4095) 100.0\n1 10 7 42.5\n\n";
        let table = load_values(Cursor::new(text), &rules).unwrap();
        let decorated = Anchor {
            yahtzee: YahtzeeFlag::Nonzero,
            upper_total: 63,
            used: 4095,
        };
        let bare = Anchor {
            yahtzee: YahtzeeFlag::Zero,
            upper_total: 10,
            used: 7,
        };
        assert_eq!(table.get(rules.anchor_to_index(decorated)), Some(100.0));
        assert_eq!(table.get(rules.anchor_to_index(bare)), Some(42.5));
        assert_eq!(table.solved_count(), 2);
    }

    #[test]
    fn malformed_lines_are_rejected() {
        let rules = YahtzeeRules::standard();
        for bad in [
            "0 0 0",             // missing value
            "0 0 0 1.0 extra",   // trailing token
            "3 0 0 1.0",         // no such flag
            "0 64 0 1.0",        // upper total past the cap
            "0 0 4096 1.0",      // mask past the category count
            "0 0 x 1.0",         // non-numeric
        ] {
            let err = load_values(Cursor::new(bad), &rules).unwrap_err();
            assert!(
                matches!(err, Error::Range(RangeError::Malformed { .. })),
                "expected malformed-line error for {bad:?}"
            );
        }
    }
}
