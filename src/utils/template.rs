//! `{{placeholder}}` template rendering.

pub struct TemplateVars;

impl TemplateVars {
    pub const DB_TYPE: &'static str = "db_type";
    pub const DB_NAME: &'static str = "db_name";
    pub const DB_USERNAME: &'static str = "db_username";
    pub const DB_PASSWORD: &'static str = "db_password";
    pub const DB_HOST: &'static str = "db_host";
}

/// Replace every `{{key}}` with its value. Unknown placeholders are left as-is.
///
/// Single pass over `template`: substituted values are written verbatim and
/// never scanned for placeholders themselves.
pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let tail = &rest[start + 2..];

        let value = tail.find("}}").and_then(|end| {
            let key = &tail[..end];
            variables
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, end))
        });

        match value {
            Some((value, end)) => {
                result.push_str(value);
                rest = &tail[end + 2..];
            }
            None => {
                result.push_str("{{");
                rest = tail;
            }
        }
    }

    result.push_str(rest);
    result
}
