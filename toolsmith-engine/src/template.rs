//! `{placeholder}` expansion for filename and URL templates.

#[derive(Debug, Clone, Default)]
pub struct TemplateVars<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub platform: &'a str,
    pub arch: &'a str,
    pub filename: &'a str,
    pub owner: &'a str,
    pub repo: &'a str,
}

impl TemplateVars<'_> {
    /// Replace known placeholders; unknown ones are left as written.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{name}", self.name)
            .replace("{version}", self.version)
            .replace("{platform}", self.platform)
            .replace("{arch}", self.arch)
            .replace("{filename}", self.filename)
            .replace("{owner}", self.owner)
            .replace("{repo}", self.repo)
    }
}
