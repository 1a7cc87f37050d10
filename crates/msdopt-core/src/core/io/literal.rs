use crate::core::residues::{CANONICAL_CODES, RESIDUE_COUNT, residue_index};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum LiteralError {
    #[error("energy literal must be enclosed in '{{' and '}}'")]
    NotAMapping,
    #[error("entry '{0}' is not of the form 'R': energy")]
    MalformedEntry(String),
    #[error("unknown residue code '{0}'")]
    UnknownResidue(String),
    #[error("invalid energy '{value}' for residue '{residue}'")]
    InvalidEnergy { residue: char, value: String },
    #[error("no energy given for residue '{0}'")]
    MissingResidue(char),
}

/// Parses a residue -> energy mapping such as `{'A': -1.2, 'C': 0.4, ...}` into
/// a dense vector in canonical residue order.
///
/// Keys may be single- or double-quoted (or bare); a trailing comma is
/// allowed; a later entry for the same residue replaces an earlier one. Every
/// one of the twenty canonical residues must be present.
pub fn parse_energy_literal(text: &str) -> Result<[f64; RESIDUE_COUNT], LiteralError> {
    let inner = text
        .trim()
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or(LiteralError::NotAMapping)?;

    let mut energies = [f64::NAN; RESIDUE_COUNT];
    let mut seen = [false; RESIDUE_COUNT];

    for entry in inner.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (key, value) = entry
            .split_once(':')
            .ok_or_else(|| LiteralError::MalformedEntry(entry.to_string()))?;
        let key = unquote(key.trim());

        let mut chars = key.chars();
        let index = match (chars.next(), chars.next()) {
            (Some(code), None) => residue_index(code),
            _ => None,
        }
        .ok_or_else(|| LiteralError::UnknownResidue(key.to_string()))?;

        let value = value.trim();
        energies[index] = value
            .parse::<f64>()
            .ok()
            .filter(|energy| energy.is_finite())
            .ok_or_else(|| LiteralError::InvalidEnergy {
                residue: CANONICAL_CODES[index],
                value: value.to_string(),
            })?;
        seen[index] = true;
    }

    if let Some(missing) = seen.iter().position(|&s| !s) {
        return Err(LiteralError::MissingResidue(CANONICAL_CODES[missing]));
    }
    Ok(energies)
}

/// Formats a dense energy vector in the same mapping syntax the parser reads.
pub fn format_energy_literal(energies: &[f64; RESIDUE_COUNT]) -> String {
    let body: Vec<String> = CANONICAL_CODES
        .iter()
        .zip(energies)
        .map(|(code, energy)| format!("'{}':{:.6}", code, energy))
        .collect();
    format!("{{{}}}", body.join(", "))
}

fn unquote(token: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = token
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal_with(overrides: &[(char, &str)]) -> String {
        let entries: Vec<String> = CANONICAL_CODES
            .iter()
            .map(|code| {
                let value = overrides
                    .iter()
                    .find(|(c, _)| c == code)
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_else(|| "1.0".to_string());
                format!("'{}':{}", code, value)
            })
            .collect();
        format!("{{{}, }}", entries.join(", "))
    }

    #[test]
    fn parses_full_mapping_in_canonical_order() {
        let energies = parse_energy_literal(&literal_with(&[('A', "-2.5"), ('Y', "3")])).unwrap();
        assert_eq!(energies[0], -2.5);
        assert_eq!(energies[19], 3.0);
        assert_eq!(energies[5], 1.0);
    }

    #[test]
    fn accepts_double_quoted_and_bare_keys() {
        let text = literal_with(&[]).replace("'A'", "\"A\"").replace("'C'", "C");
        assert!(parse_energy_literal(&text).is_ok());
    }

    #[test]
    fn later_entry_replaces_earlier_one() {
        let text = literal_with(&[]).replacen('{', "{'D': 9.0, ", 1);
        let energies = parse_energy_literal(&text).unwrap();
        assert_eq!(energies[2], 1.0);
    }

    #[test]
    fn rejects_missing_braces() {
        assert_eq!(
            parse_energy_literal("'A': 1.0"),
            Err(LiteralError::NotAMapping)
        );
    }

    #[test]
    fn rejects_missing_residue() {
        let text = literal_with(&[]).replace("'W':1.0, ", "");
        assert_eq!(
            parse_energy_literal(&text),
            Err(LiteralError::MissingResidue('W'))
        );
    }

    #[test]
    fn rejects_non_canonical_residue() {
        let text = literal_with(&[]).replacen('{', "{'X': 0.0, ", 1);
        assert_eq!(
            parse_energy_literal(&text),
            Err(LiteralError::UnknownResidue("X".to_string()))
        );
    }

    #[test]
    fn rejects_unparseable_energy() {
        let text = literal_with(&[('K', "lots")]);
        assert_eq!(
            parse_energy_literal(&text),
            Err(LiteralError::InvalidEnergy {
                residue: 'K',
                value: "lots".to_string()
            })
        );
    }

    #[test]
    fn rejects_non_finite_energies() {
        for value in ["nan", "inf", "-inf", "1e400"] {
            let text = literal_with(&[('G', value)]);
            assert_eq!(
                parse_energy_literal(&text),
                Err(LiteralError::InvalidEnergy {
                    residue: 'G',
                    value: value.to_string()
                }),
                "{} should be rejected",
                value
            );
        }
    }

    #[test]
    fn rejects_entry_without_colon() {
        let text = literal_with(&[]).replacen('{', "{'A' 1.0, ", 1);
        assert!(matches!(
            parse_energy_literal(&text),
            Err(LiteralError::MalformedEntry(_))
        ));
    }

    #[test]
    fn formatted_literal_parses_back() {
        let mut energies = [0.0; RESIDUE_COUNT];
        energies[7] = -1.25;
        let text = format_energy_literal(&energies);
        assert!(text.starts_with("{'A':0.000000"));
        assert_eq!(parse_energy_literal(&text).unwrap(), energies);
    }
}
