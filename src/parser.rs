use crate::error::{FamilyError, Result};
use crate::ir::{
    Attribute, FamilyRecords, Lifespan, Record, RecordKind, UNION_SEPARATOR,
    is_placeholder_marker, placeholder_key, union_name,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static ATTRIBUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+(?P<key>[^\s:]+):\s*(?P<value>.*?)\s*$").unwrap());

/// Parses the line-oriented family record format.
///
/// ```text
/// # comment
/// Alice
///   l: 1901-1980
/// Bob
/// Alice + Bob
///   c: Carol, ?
/// Carol
///   n: Moved to Lisbon
/// ```
pub fn parse_records(input: &str) -> Result<FamilyRecords> {
    let mut state = ParseState::default();

    for (idx, raw_line) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim_end_matches('\r');
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if line.starts_with(char::is_whitespace) {
            state.attribute_line(line, line_no)?;
        } else {
            state.entity_line(trimmed, line_no)?;
        }
    }

    log::debug!("parsed {} family records", state.out.len());
    Ok(state.out)
}

#[derive(Default)]
struct ParseState {
    out: FamilyRecords,
    current: Option<usize>,
    persons: HashSet<String>,
    unions: HashSet<String>,
    placeholder_serial: usize,
}

impl ParseState {
    fn entity_line(&mut self, line: &str, line_no: usize) -> Result<()> {
        if line.contains(',') {
            return Err(syntax(line_no, format!("name `{line}` may not contain a comma")));
        }
        let kind = match line.matches('+').count() {
            0 => {
                if is_placeholder_marker(line) {
                    return Err(syntax(
                        line_no,
                        format!("placeholder `{line}` cannot be defined as a person"),
                    ));
                }
                if !self.persons.insert(line.to_string()) {
                    return Err(FamilyError::DuplicatePerson {
                        name: line.to_string(),
                        line: line_no,
                    });
                }
                RecordKind::Person {
                    name: line.to_string(),
                }
            }
            1 => self.union_kind(line, line_no)?,
            _ => {
                return Err(syntax(
                    line_no,
                    format!("union `{line}` has more than one `+`"),
                ));
            }
        };
        self.out.records.push(Record {
            kind,
            line: line_no,
            attributes: Vec::new(),
        });
        self.current = Some(self.out.records.len() - 1);
        Ok(())
    }

    fn union_kind(&mut self, line: &str, line_no: usize) -> Result<RecordKind> {
        let Some((left, right)) = line.split_once(UNION_SEPARATOR) else {
            return Err(syntax(
                line_no,
                format!("union `{line}` must join its names with `{UNION_SEPARATOR}`"),
            ));
        };
        let (left, right) = (left.trim(), right.trim());
        if left.is_empty() || right.is_empty() {
            return Err(syntax(
                line_no,
                format!("union `{line}` needs a name on both sides of `+`"),
            ));
        }
        if left == right && !is_placeholder_marker(left) {
            return Err(syntax(
                line_no,
                format!("`{left}` cannot form a union with themselves"),
            ));
        }
        let left = self.resolve_name(left, line_no);
        let right = self.resolve_name(right, line_no);
        let name = union_name(&left, &right);
        if !self.unions.insert(name.clone()) {
            return Err(FamilyError::DuplicateUnion {
                name,
                line: line_no,
            });
        }
        Ok(RecordKind::Union { left, right })
    }

    fn attribute_line(&mut self, line: &str, line_no: usize) -> Result<()> {
        let Some(current) = self.current else {
            return Err(syntax(
                line_no,
                "attribute line before any person or union".to_string(),
            ));
        };
        let Some(caps) = ATTRIBUTE_RE.captures(line) else {
            return Err(syntax(
                line_no,
                format!("expected `n:`, `l:`, `p:` or `c:` but found `{}`", line.trim()),
            ));
        };
        let value = &caps["value"];
        let attribute = match &caps["key"] {
            "n" => Attribute::Note(value.to_string()),
            "l" => Attribute::Lifespan(parse_lifespan(value, line_no)?),
            "p" => {
                if value.is_empty() {
                    return Err(syntax(line_no, "empty photo reference".to_string()));
                }
                Attribute::Photo(value.to_string())
            }
            "c" => Attribute::Children(self.parse_children(value, line_no)?),
            other => {
                return Err(syntax(
                    line_no,
                    format!("unrecognised attribute prefix `{other}:`"),
                ));
            }
        };
        self.out.records[current].attributes.push(attribute);
        Ok(())
    }

    fn parse_children(&mut self, value: &str, line_no: usize) -> Result<Vec<String>> {
        let mut children = Vec::new();
        for item in value.split(',') {
            let item = item.trim();
            if item.is_empty() {
                return Err(syntax(line_no, "empty name in child list".to_string()));
            }
            if item.contains('+') {
                return Err(syntax(
                    line_no,
                    format!("child `{item}` must be a person, not a union"),
                ));
            }
            children.push(self.resolve_name(item, line_no));
        }
        Ok(children)
    }

    /// Placeholders become fresh, implicitly defined persons.
    fn resolve_name(&mut self, name: &str, line_no: usize) -> String {
        if !is_placeholder_marker(name) {
            return name.to_string();
        }
        self.placeholder_serial += 1;
        let key = placeholder_key(name, self.placeholder_serial);
        self.out.records.push(Record {
            kind: RecordKind::Person { name: key.clone() },
            line: line_no,
            attributes: Vec::new(),
        });
        key
    }
}

fn parse_lifespan(value: &str, line_no: usize) -> Result<Lifespan> {
    let Some((birth, death)) = value.split_once('-') else {
        return Err(syntax(
            line_no,
            format!("lifespan `{value}` must be `birth-death`"),
        ));
    };
    if death.contains('-') {
        return Err(syntax(
            line_no,
            format!("lifespan `{value}` has more than one `-`"),
        ));
    }
    let part = |raw: &str| {
        let raw = raw.trim();
        (!raw.is_empty()).then(|| raw.to_string())
    };
    Ok(Lifespan {
        birth: part(birth),
        death: part(death),
    })
}

fn syntax(line: usize, message: String) -> FamilyError {
    FamilyError::Syntax { line, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::display_name;

    #[test]
    fn parses_people_unions_and_attributes() {
        let input = "\
# the Smiths
Alice
  l: 1901-1980
  p: alice.jpg
Bob

Alice + Bob
  c: Carol, Dan
  l: 1925-
Carol
  n: first note
  n: second note
Dan
";
        let parsed = parse_records(input).unwrap();
        assert_eq!(parsed.len(), 5);
        let alice = parsed.get("Alice").unwrap();
        assert_eq!(alice.line, 2);
        assert_eq!(
            alice.attributes[0],
            Attribute::Lifespan(Lifespan {
                birth: Some("1901".into()),
                death: Some("1980".into()),
            })
        );
        assert_eq!(alice.attributes[1], Attribute::Photo("alice.jpg".into()));
        let union = parsed.get("Alice + Bob").unwrap();
        assert!(union.is_union());
        assert_eq!(
            union.attributes[0],
            Attribute::Children(vec!["Carol".into(), "Dan".into()])
        );
        assert_eq!(parsed.get("Carol").unwrap().attributes.len(), 2);
    }

    #[test]
    fn duplicate_person_is_fatal_and_named() {
        let err = parse_records("Alice\nBob\nAlice\n").unwrap_err();
        assert_eq!(
            err,
            FamilyError::DuplicatePerson {
                name: "Alice".into(),
                line: 3,
            }
        );
        assert!(err.to_string().contains("Alice"));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(matches!(
            parse_records("Alice, Bob\n"),
            Err(FamilyError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            parse_records("A + B + C\n"),
            Err(FamilyError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            parse_records("Alice\n  x: what\n"),
            Err(FamilyError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            parse_records("Alice\n  no prefix here\n"),
            Err(FamilyError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            parse_records("  n: orphan note\n"),
            Err(FamilyError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            parse_records("Alice\n  l: 1900\n"),
            Err(FamilyError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            parse_records("Alice + Alice\n"),
            Err(FamilyError::Syntax { .. })
        ));
    }

    #[test]
    fn union_needs_spaced_separator() {
        for line in ["Alice+Bob\n", "Alice +Bob\n", "Alice+ Bob\n"] {
            assert!(
                matches!(parse_records(line), Err(FamilyError::Syntax { line: 1, .. })),
                "{line:?} should be rejected"
            );
        }
        let records = parse_records("Alice  +  Bob\n").unwrap();
        assert!(matches!(
            &records.records[0].kind,
            RecordKind::Union { left, right } if left == "Alice" && right == "Bob"
        ));
    }

    #[test]
    fn duplicate_union_is_fatal() {
        let err = parse_records("A\nB\nA + B\nA + B\n").unwrap_err();
        assert!(matches!(err, FamilyError::DuplicateUnion { line: 4, .. }));
    }

    #[test]
    fn placeholders_never_collide() {
        let parsed = parse_records("Alice\n? + Alice\n  c: ?, ...\n... + ?\n").unwrap();
        let placeholders: Vec<String> = parsed
            .records
            .iter()
            .filter(|record| !record.is_union())
            .map(|record| record.name())
            .filter(|name| name != "Alice")
            .collect();
        assert_eq!(placeholders.len(), 5);
        let unique: HashSet<&String> = placeholders.iter().collect();
        assert_eq!(unique.len(), 5);
        for key in &placeholders {
            assert!(matches!(display_name(key), "?" | "..."));
        }
    }

    #[test]
    fn placeholders_cannot_be_defined_directly() {
        assert!(matches!(
            parse_records("?\n"),
            Err(FamilyError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn lifespan_sides_are_optional() {
        let parsed = parse_records("Alice\n  l: -1990\nBob\n  l:  c. 1850 - \n").unwrap();
        assert_eq!(
            parsed.get("Alice").unwrap().attributes[0],
            Attribute::Lifespan(Lifespan {
                birth: None,
                death: Some("1990".into()),
            })
        );
        assert_eq!(
            parsed.get("Bob").unwrap().attributes[0],
            Attribute::Lifespan(Lifespan {
                birth: Some("c. 1850".into()),
                death: None,
            })
        );
    }
}
