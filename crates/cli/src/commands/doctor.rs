use std::collections::HashSet;

use serde::Serialize;
use tuhfa_core::config::{AppConfig, LoadOptions};
use tuhfa_core::{Catalog, ImageRequest, ImageUrlPolicy};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Skipped, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass(
                "config_validation",
                "configuration loaded and validated",
            ));
            match Catalog::load(config.catalog.data_dir.as_deref()) {
                Ok(catalog) => {
                    checks.push(check_catalog_integrity(&catalog));
                    checks.push(check_image_policy(&config, &catalog));
                }
                Err(error) => {
                    checks.push(DoctorCheck::fail("catalog_integrity", error.to_string()));
                    checks.push(DoctorCheck::skipped(
                        "image_policy",
                        "skipped because the catalog did not load",
                    ));
                }
            }
            checks.push(check_fallback_image(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            for name in ["catalog_integrity", "image_policy", "fallback_image"] {
                checks.push(DoctorCheck::skipped(
                    name,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_catalog_integrity(catalog: &Catalog) -> DoctorCheck {
    if catalog.is_empty() {
        return DoctorCheck::fail("catalog_integrity", "catalog has no products");
    }

    let categories: HashSet<_> = catalog.categories().iter().map(|category| &category.id).collect();
    let occasions: HashSet<_> = catalog.occasions().iter().map(|occasion| &occasion.id).collect();

    let mut problems = Vec::new();
    for product in catalog.products() {
        if !categories.contains(&product.category_id) {
            problems.push(format!(
                "product {} references unknown category `{}`",
                product.id,
                product.category_id.as_str()
            ));
        }
        if let Some(occasion) = &product.occasion_id {
            if !occasions.contains(occasion) {
                problems.push(format!(
                    "product {} references unknown occasion `{}`",
                    product.id,
                    occasion.as_str()
                ));
            }
        }
    }

    if problems.is_empty() {
        DoctorCheck::pass(
            "catalog_integrity",
            format!(
                "{} products across {} categories and {} occasions",
                catalog.len(),
                categories.len(),
                occasions.len()
            ),
        )
    } else {
        DoctorCheck::fail("catalog_integrity", problems.join("; "))
    }
}

fn check_image_policy(config: &AppConfig, catalog: &Catalog) -> DoctorCheck {
    let policy = ImageUrlPolicy::from_config(&config.images);
    let request = ImageRequest::new(config.images.default_quality);

    let on_cdn: Vec<&str> = catalog
        .products()
        .iter()
        .map(|product| product.image_url.as_str())
        .filter(|src| policy.is_cdn_url(src))
        .collect();

    let Some(sample) = on_cdn.first() else {
        return DoctorCheck::fail(
            "image_policy",
            format!(
                "no product image is served by `{}`; check images.cdn_host",
                policy.cdn_host()
            ),
        );
    };

    let resolved = policy.resolve(sample, &request);
    let rewritten = if request.wants_original() {
        "default quality serves originals"
    } else if resolved != *sample {
        "compression hints applied"
    } else {
        return DoctorCheck::fail(
            "image_policy",
            format!("`{sample}` was not rewritten at quality {}", request.quality),
        );
    };

    DoctorCheck::pass(
        "image_policy",
        format!(
            "{}/{} product images on `{}`; {rewritten}",
            on_cdn.len(),
            catalog.len(),
            policy.cdn_host()
        ),
    )
}

fn check_fallback_image(config: &AppConfig) -> DoctorCheck {
    match &config.images.fallback_url {
        Some(url) => DoctorCheck::pass("fallback_image", format!("fallback image `{url}`")),
        None => DoctorCheck::skipped(
            "fallback_image",
            "no images.fallback_url configured; failed images show the placeholder glyph",
        ),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
