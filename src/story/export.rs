// Standalone HTML export of a built story.
//
// The document embeds the story JSON and loads the renderer from its CDN,
// so the file works without the page that produced it. Filter expressions
// travel as record-expression strings and are turned back into functions by
// the small inline loader.

use std::fs;

use serde_json::Value as JSValue;
use snafu::prelude::*;

use crate::story::{PopstoryResult, WritingOutputSnafu};

const RENDERER_CDN: &str = "https://cdn.jsdelivr.net/npm/vizzu-story@0.7/dist/vizzu-story.min.js";

const CHART_WIDTH: u32 = 600;
const CHART_HEIGHT: u32 = 450;

/// Renders the exported document. The story JSON is embedded verbatim in a
/// JSON script element and wired to the player by the inline module.
pub fn render_html(title: &str, story: &JSValue) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8"/>
<meta name="viewport" content="width=device-width, initial-scale=1"/>
<title>{title}</title>
<style>
body {{ font-family: Arial, Helvetica, sans-serif; margin: 20px; color: #222; background: #fff; display: flex; flex-direction: column; align-items: center; }}
h1 {{ margin: 0 0 16px 0; font-size: 24px; }}
vizzu-player {{ width: {width}px; height: {height}px; }}
</style>
</head>
<body>
<h1>{title}</h1>
<vizzu-player controller></vizzu-player>
<script type="application/json" id="story">
{story}
</script>
<script type="module">
import VizzuPlayer from "{cdn}";

const story = JSON.parse(document.getElementById("story").textContent);
const slides = story.slides.map((slide) =>
  slide.steps.map((step) => {{
    const out = {{ config: step.config }};
    if ("filter" in step) {{
      out.filter =
        step.filter === null
          ? null
          : new Function("record", "return (" + step.filter + ");");
    }}
    if ("style" in step) {{
      out.style = step.style;
    }}
    return out;
  }})
);

const player = document.querySelector("vizzu-player");
player.slides = {{ data: story.data, slides }};
if ("startSlide" in story) {{
  player.setAttribute("start-slide", story.startSlide);
}}
if (story.features && story.features.tooltip) {{
  player.vizzuLoaded.then((chart) => chart.feature("tooltip", true));
}}
</script>
</body>
</html>
"#,
        title = title,
        width = CHART_WIDTH,
        height = CHART_HEIGHT,
        story = story,
        cdn = RENDERER_CDN,
    )
}

/// Writes the exported document to the given path.
pub fn write_html(path: &str, title: &str, story: &JSValue) -> PopstoryResult<()> {
    let html = render_html(title, story);
    fs::write(path, html).context(WritingOutputSnafu { path })?;
    Ok(())
}
