//! Conversions between binary type names (`net.game.Entity`, `int[]`),
//! internal names (`net/game/Entity`) and JVM descriptors.

const PRIMITIVES: [(&str, char); 9] = [
    ("boolean", 'Z'),
    ("byte", 'B'),
    ("char", 'C'),
    ("short", 'S'),
    ("int", 'I'),
    ("long", 'J'),
    ("float", 'F'),
    ("double", 'D'),
    ("void", 'V'),
];

pub fn to_internal(binary: &str) -> String {
    binary.replace('.', "/")
}

pub fn to_binary(internal: &str) -> String {
    internal.replace('/', ".")
}

/// Last segment of a binary or internal name.
pub fn simple_name(name: &str) -> &str {
    name.rsplit(['.', '/']).next().unwrap_or(name)
}

pub fn is_primitive(type_name: &str) -> bool {
    PRIMITIVES.iter().any(|(name, _)| *name == type_name)
}

/// Splits `a.B[][]` into `("a.B", 2)`.
pub fn element_type(type_name: &str) -> (&str, usize) {
    let mut element = type_name;
    let mut dimensions = 0;
    while let Some(stripped) = element.strip_suffix("[]") {
        element = stripped;
        dimensions += 1;
    }
    (element, dimensions)
}

/// Descriptor of a single binary type name, e.g. `java.lang.String[]` -> `[Ljava/lang/String;`.
pub fn type_descriptor(type_name: &str) -> String {
    let (element, dimensions) = element_type(type_name);
    let mut out = "[".repeat(dimensions);
    match PRIMITIVES.iter().find(|(name, _)| *name == element) {
        Some((_, code)) => out.push(*code),
        None => {
            out.push('L');
            out.push_str(&to_internal(element));
            out.push(';');
        }
    }
    out
}

/// Parameter part of a method descriptor, including the parentheses.
pub fn parameters_descriptor<S: AsRef<str>>(parameters: &[S]) -> String {
    let mut out = String::from("(");
    for parameter in parameters {
        out.push_str(&type_descriptor(parameter.as_ref()));
    }
    out.push(')');
    out
}

pub fn method_descriptor<S: AsRef<str>>(parameters: &[S], return_type: &str) -> String {
    let mut out = parameters_descriptor(parameters);
    out.push_str(&type_descriptor(return_type));
    out
}

/// Applies `map` to the element class of a binary type name, keeping primitives
/// and array dimensions intact.
pub fn map_element_type(type_name: &str, map: impl FnOnce(&str) -> String) -> String {
    let (element, dimensions) = element_type(type_name);
    if is_primitive(element) {
        return type_name.to_string();
    }
    let mut mapped = map(element);
    for _ in 0..dimensions {
        mapped.push_str("[]");
    }
    mapped
}
