use askama::Template;

#[derive(Template)]
#[template(path = "login.txt", escape = "none")]
struct LoginTemplate<'a> {
    error: &'a str,
}

/// Login form header, with the inline error from the previous attempt if any.
pub fn render(error: Option<&str>) -> Result<String, askama::Error> {
    LoginTemplate {
        error: error.unwrap_or_default(),
    }
    .render()
}
