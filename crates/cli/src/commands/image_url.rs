use clap::Args;
use serde::Serialize;
use tuhfa_core::config::{AppConfig, LoadOptions};
use tuhfa_core::{ImageRequest, ImageUrlPolicy};

use super::CommandResult;

const COMMAND: &str = "image-url";

#[derive(Debug, Args)]
pub struct ImageUrlArgs {
    #[arg(help = "Source image URL")]
    pub src: String,
    #[arg(long, help = "Quality 1-100; defaults to images.default_quality")]
    pub quality: Option<u8>,
    #[arg(long, help = "Target width in pixels")]
    pub width: Option<u32>,
    #[arg(long, help = "Above-the-fold image; always served untouched")]
    pub priority: bool,
    #[arg(long, help = "Also print the blur-up placeholder URL")]
    pub placeholder: bool,
}

#[derive(Debug, Serialize)]
struct ResolvedImage<'a> {
    src: &'a str,
    cdn: bool,
    quality: u8,
    resolved: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    placeholder: Option<String>,
}

pub fn run(args: &ImageUrlArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(COMMAND, "config_validation", error.to_string(), 2)
        }
    };

    let quality = args.quality.unwrap_or(config.images.default_quality);
    if !(1..=100).contains(&quality) {
        return CommandResult::failure(
            COMMAND,
            "invalid_input",
            format!("quality must be between 1 and 100, got {quality}"),
            2,
        );
    }

    let policy = ImageUrlPolicy::from_config(&config.images);
    CommandResult::data(COMMAND, &resolve(&policy, args, quality))
}

fn resolve<'a>(policy: &ImageUrlPolicy, args: &'a ImageUrlArgs, quality: u8) -> ResolvedImage<'a> {
    let mut request = ImageRequest::new(quality).with_priority(args.priority);
    if let Some(width) = args.width {
        request = request.with_width(width);
    }

    ResolvedImage {
        src: &args.src,
        cdn: policy.is_cdn_url(&args.src),
        quality,
        resolved: policy.resolve(&args.src, &request),
        placeholder: args.placeholder.then(|| policy.placeholder(&args.src, args.width)),
    }
}

#[cfg(test)]
mod tests {
    use tuhfa_core::ImageUrlPolicy;

    use super::{resolve, ImageUrlArgs};

    fn args(src: &str) -> ImageUrlArgs {
        ImageUrlArgs { src: src.into(), quality: None, width: Some(400), priority: false, placeholder: true }
    }

    #[test]
    fn foreign_origin_passes_through_with_identical_placeholder() {
        let policy = ImageUrlPolicy::default();
        let args = args("https://example.com/gift.png");

        let resolved = resolve(&policy, &args, 60);
        assert!(!resolved.cdn);
        assert_eq!(resolved.resolved, "https://example.com/gift.png");
        assert_eq!(resolved.placeholder.as_deref(), Some("https://example.com/gift.png"));
    }

    #[test]
    fn priority_keeps_cdn_original() {
        let policy = ImageUrlPolicy::default();
        let mut args = args("https://images.pexels.com/photos/1/a.jpeg");
        args.priority = true;

        let resolved = resolve(&policy, &args, 40);
        assert!(resolved.cdn);
        assert_eq!(resolved.resolved, "https://images.pexels.com/photos/1/a.jpeg");
        let placeholder = resolved.placeholder.expect("placeholder requested");
        assert!(placeholder.contains("w=100"), "placeholder should be capped: {placeholder}");
    }
}
