/// Pretty print generated rust source, failing if it doesn't parse.
///
/// `syn` drops ordinary comments, so the leading block of `//` comments (the generated file header)
/// is split off first and put back in front of the formatted code.
pub fn format_source(raw: &str) -> Result<String, syn::Error> {
    let (header, body) = split_header(raw);
    let file = syn::parse_file(body)?;
    let formatted = prettyplease::unparse(&file);

    let mut output = String::with_capacity(header.len() + formatted.len());
    output.push_str(header);
    output.push_str(&formatted);
    Ok(output)
}

/// Split the source after the last line of the leading comment block, blank lines included.
/// Doc comments are left in the body because they're part of the syntax tree.
fn split_header(raw: &str) -> (&str, &str) {
    let mut end = 0;
    for line in raw.split_inclusive('\n') {
        let trimmed = line.trim();
        let plain_comment =
            trimmed.starts_with("//") && !trimmed.starts_with("///") && !trimmed.starts_with("//!");
        if !plain_comment && !trimmed.is_empty() {
            break;
        }
        end += line.len();
    }
    raw.split_at(end)
}
