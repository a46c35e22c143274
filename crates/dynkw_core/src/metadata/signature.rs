//! Type-signature decoding.

/// Decodes a raw metadata type signature to the engine's type name.
///
/// Well-known primitives map to short names (`System.Int32` -> `int`); other
/// types keep their simple name (`Contoso.Widget+Shape` -> `Shape`). Array
/// ranks are preserved as `[]` suffixes.
pub fn decode_type_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(element) = trimmed.strip_suffix("[]") {
        return format!("{}[]", decode_type_name(element));
    }

    let short = match trimmed {
        "System.String" => Some("string"),
        "System.Int32" | "System.Int64" | "System.Int16" | "System.UInt32" | "System.Byte" => {
            Some("int")
        }
        "System.Boolean" => Some("bool"),
        "System.Management.Automation.SwitchParameter" => Some("switch"),
        "System.Collections.Hashtable" => Some("hashtable"),
        "System.Object" => Some("object"),
        _ => None,
    };
    if let Some(short) = short {
        return short.to_string();
    }

    simple_name(trimmed).to_string()
}

/// Last segment of a dotted / `+`-nested type name.
pub fn simple_name(name: &str) -> &str {
    name.rsplit(['.', '+']).next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::{decode_type_name, simple_name};

    #[test]
    fn decodes_primitives_and_arrays() {
        assert_eq!(decode_type_name("System.String"), "string");
        assert_eq!(decode_type_name("System.Int32[]"), "int[]");
        assert_eq!(decode_type_name("System.Boolean"), "bool");
    }

    #[test]
    fn keeps_simple_name_for_user_types() {
        assert_eq!(decode_type_name("Contoso.Widget+Shape"), "Shape");
        assert_eq!(decode_type_name("Shape"), "Shape");
        assert_eq!(simple_name("Contoso.Dsl.Keyword"), "Keyword");
    }
}
