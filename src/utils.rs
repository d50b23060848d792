use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

use intl_pluralrules::{PluralCategory, PluralRuleType, PluralRules};
use unic_langid::LanguageIdentifier;

const FORMAT_FUNCTION_VALUE_PLACEHOLDER: &str = "<VALUE PLACEHOLDER>";

/// Expands all [format functions](https://yarnspinner.dev/docs/syntax#format-functions)
/// in a given string, using pluralisation rules specified by the given locale (as an IETF
/// BCP-47 language tag).
///
/// A `[` that does not start a `select`, `plural` or `ordinal` function is
/// kept as plain text.
pub fn expand_format_functions(input: &str, locale_code: &str) -> Result<String, String> {
    let (mut line_with_replacements, format_functions) = parse_format_functions(input)?;
    if format_functions.is_empty() {
        return Ok(line_with_replacements);
    }

    let langid: LanguageIdentifier = locale_code.parse()
        .map_err(|_| format!("invalid locale {:?}", locale_code))?;

    let ordinal_rules = PluralRules::create(langid.clone(), PluralRuleType::ORDINAL)?;
    let cardinal_rules = PluralRules::create(langid, PluralRuleType::CARDINAL)?;

    for (i, function) in format_functions.iter().enumerate() {
        // Get the key str to look up in the function data.
        let data_key = match function.kind {
            FormatFunctionKind::Select => function.value.as_str(),
            FormatFunctionKind::Plural | FormatFunctionKind::Ordinal => {
                let value: f64 = function.value.trim().parse()
                    .map_err(|_| format!("Error while pluralising line '{}': '{}' is not a number", input, &function.value))?;
                let rules = match function.kind {
                    FormatFunctionKind::Ordinal => &ordinal_rules,
                    _ => &cardinal_rules,
                };
                get_plural_case_str(rules.select(value)?)
            }
        };

        let mut replacement = function.data.get(data_key)
            .cloned()
            .unwrap_or_else(|| format!("<no replacement for {}>", data_key));

        // Insert the value if needed
        replacement = replacement.replace(FORMAT_FUNCTION_VALUE_PLACEHOLDER, &function.value);

        line_with_replacements = line_with_replacements.replacen(&format!("{{{}}}", i), &replacement, 1);
    }

    Ok(line_with_replacements)
}

fn get_plural_case_str(plural_case: PluralCategory) -> &'static str {
    match plural_case {
        PluralCategory::ZERO => "zero",
        PluralCategory::ONE => "one",
        PluralCategory::TWO => "two",
        PluralCategory::FEW => "few",
        PluralCategory::MANY => "many",
        PluralCategory::OTHER => "other",
    }
}

#[derive(Debug, PartialEq, Eq)]
enum FormatFunctionKind {
    Select,
    Plural,
    Ordinal,
}

impl FormatFunctionKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "select" => Some(Self::Select),
            "plural" => Some(Self::Plural),
            "ordinal" => Some(Self::Ordinal),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct ParsedFormatFunction {
    kind: FormatFunctionKind,
    value: String,
    data: HashMap<String, String>,
}

type Input<'a> = Peekable<Chars<'a>>;

fn parse_format_functions(input: &str) -> Result<(String, Vec<ParsedFormatFunction>), String> {
    let mut chars = input.chars().peekable();

    let mut line_with_replacements = String::with_capacity(input.len());

    let mut parsed_functions = Vec::new();

    // Read the entirety of the line
    while let Some(c) = chars.next() {
        if c != '[' {
            // plain text!
            line_with_replacements.push(c);
            continue;
        }

        // Structure of a format function:
        // [ name "value" key1="value1" key2="value2" ]
        let kind = {
            let mut lookahead = chars.clone();
            expect_id(&mut lookahead, input)
                .ok()
                .and_then(|name| FormatFunctionKind::from_name(&name))
                .map(|kind| (kind, lookahead))
        };
        let kind = match kind {
            Some((kind, rest)) => {
                chars = rest;
                kind
            }
            None => {
                line_with_replacements.push(c);
                continue;
            }
        };

        let value = expect_value(&mut chars, input)?;
        let mut data = HashMap::new();

        // parse and read the data for this format function
        loop {
            consume_whitespace(&mut chars, input)?;

            if let Some(']') = chars.peek() {
                // we're done adding parameters
                break;
            }

            // this is a key-value pair
            let key = expect_id(&mut chars, input)?;
            expect_character(&mut chars, '=', input)?;
            let value = expect_string(&mut chars, input)?;

            if data.contains_key(&key) {
                return Err(format!("Duplicate value '{}' in format function inside line \"{}\"", &key, input));
            }

            data.insert(key, value);
        }

        // We now expect the end of this format function
        expect_character(&mut chars, ']', input)?;

        parsed_functions.push(ParsedFormatFunction { kind, value, data });

        // and add a placeholder for this function's value
        line_with_replacements.push_str(&format!("{{{}}}", parsed_functions.len() - 1));
    }

    Ok((line_with_replacements, parsed_functions))
}

// id = [_\w][\w0-9_]*
fn expect_id(chars: &mut Input<'_>, input: &str) -> Result<String, String> {
    consume_whitespace(chars, input)?;

    let mut id_string = String::new();

    // Read the first character, which must be a letter
    match chars.next() {
        Some(next_char) if next_char.is_alphabetic() || next_char == '_' => id_string.push(next_char),
        _ => return Err(format!("Expected an identifier inside a format function in line \"{}\"", input)),
    }

    // Read zero or more letters, numbers, or underscores
    while let Some(&next_char) = chars.peek() {
        if next_char.is_alphanumeric() || next_char == '_' {
            id_string.push(next_char);
            chars.next();
        } else {
            break;
        }
    }

    Ok(id_string)
}

// value = string | [^\s\]]+
// Source files write `[plural {$n} ...]`, which reaches us as a bare number.
fn expect_value(chars: &mut Input<'_>, input: &str) -> Result<String, String> {
    consume_whitespace(chars, input)?;

    if let Some('"') = chars.peek() {
        return expect_string(chars, input);
    }

    let mut value = String::new();
    while let Some(&next_char) = chars.peek() {
        if next_char.is_whitespace() || next_char == ']' {
            break;
        }
        value.push(next_char);
        chars.next();
    }

    if value.is_empty() {
        return Err(format!("Expected a value inside a format function in line \"{}\"", input));
    }
    Ok(value)
}

// string = " (\"|\\|^["])* "
fn expect_string(chars: &mut Input<'_>, input: &str) -> Result<String, String> {
    consume_whitespace(chars, input)?;

    if chars.next() != Some('"') {
        return Err(format!("Expected a string inside a format function in line \"{}\"", input));
    }

    let mut string = String::new();
    loop {
        match chars.next() {
            // end of string - consume it but don't append to the final collection
            Some('"') => break,
            Some('\\') => {
                // an escaped quote or backslash
                match chars.next() {
                    Some(escaped) if escaped == '\\' || escaped == '"' || escaped == '%' => string.push(escaped),
                    Some(_) => {}
                    None => break,
                }
            }
            Some('%') => string.push_str(FORMAT_FUNCTION_VALUE_PLACEHOLDER),
            Some(next_char) => string.push(next_char),
            None => return Err(format!("Unterminated string inside a format function in line \"{}\"", input)),
        }
    }

    Ok(string)
}

fn expect_character(chars: &mut Input<'_>, expected_char: char, input: &str) -> Result<(), String> {
    consume_whitespace(chars, input)?;

    if chars.next() != Some(expected_char) {
        return Err(format!("Expected a {} inside a format function in line \"{}\"", expected_char, input));
    }
    Ok(())
}

// Read and discard all whitespace until we hit something that isn't whitespace.
fn consume_whitespace(chars: &mut Input<'_>, input: &str) -> Result<(), String> {
    loop {
        match chars.peek() {
            Some(next_char) if next_char.is_whitespace() => {
                chars.next();
            }
            Some(_) => return Ok(()),
            None => return Err(format!("Unexpected end of line inside a format function in line \"{}\"", input)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural() {
        let line = "I have [plural \"3\" one=\"% apple\" other=\"% apples\"].";
        assert_eq!(expand_format_functions(line, "en").unwrap(), "I have 3 apples.");

        let line = "I have [plural \"1\" one=\"% apple\" other=\"% apples\"].";
        assert_eq!(expand_format_functions(line, "en").unwrap(), "I have 1 apple.");
    }

    #[test]
    fn test_unquoted_value() {
        let line = "I have [plural 3 one=\"% apple\" other=\"% apples\"].";
        assert_eq!(expand_format_functions(line, "en").unwrap(), "I have 3 apples.");

        let line = "[select f m=\"He\" f=\"She\"] waves.";
        assert_eq!(expand_format_functions(line, "en").unwrap(), "She waves.");

        assert!(expand_format_functions("[plural ]", "en").is_err());
    }

    #[test]
    fn test_ordinal_and_select() {
        let line = "You came [ordinal \"2\" one=\"%st\" two=\"%nd\" few=\"%rd\" other=\"%th\"]!";
        assert_eq!(expand_format_functions(line, "en").unwrap(), "You came 2nd!");

        let line = "[select \"f\" m=\"He\" f=\"She\"] waves.";
        assert_eq!(expand_format_functions(line, "en").unwrap(), "She waves.");
    }

    #[test]
    fn test_plain_brackets() {
        let line = "[laughs] That's [not] a function.";
        assert_eq!(expand_format_functions(line, "en").unwrap(), line);
    }

    #[test]
    fn test_bad_number() {
        let line = "[plural \"many\" one=\"a\" other=\"b\"]";
        assert!(expand_format_functions(line, "en").is_err());
    }
}
