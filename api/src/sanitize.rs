use std::{collections::HashSet, sync::LazyLock};

use ammonia::Builder;

/// No tag survives. Script and style go together with their body.
static PLAIN_TEXT: LazyLock<Builder<'static>> = LazyLock::new(|| {
    let mut builder = Builder::empty();
    builder.clean_content_tags(HashSet::from(["script", "style"]));
    builder
});

/// Reduces user supplied text to plain text. The input is parsed as HTML,
/// every element is dropped and its text kept, except script and style whose
/// body goes as well. A lone `<` or `>` is text and stays.
pub fn strip_markup(input: &str) -> String {
    let escaped = PLAIN_TEXT.clean(input).to_string();

    // the cleaner hands back HTML, comments are stored and served as text
    escaped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
