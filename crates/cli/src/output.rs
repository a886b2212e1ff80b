use serde::Serialize;

/// Where command results go: JSON for scripts, plain lines for people.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print `value` as JSON, or the lines produced by `render`.
    pub fn emit<T, I>(&self, value: &T, render: impl FnOnce(&T) -> I) -> anyhow::Result<()>
    where
        T: Serialize + ?Sized,
        I: IntoIterator<Item = String>,
    {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            for line in render(value) {
                println!("{line}");
            }
        }
        Ok(())
    }
}
