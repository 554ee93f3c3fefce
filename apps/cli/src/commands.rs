use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use futures::FutureExt;
use rust_decimal::Decimal;

use autoclaim_core::assessment::{
    AssessmentResult, AssessmentServiceTrait, ImagePayload, ReportRepositoryTrait, SavedReport,
};
use autoclaim_core::credits::{CreditAccount, CreditLedgerTrait, NewCreditAccount};
use autoclaim_core::fx::CurrencyCode;
use autoclaim_core::overlay::{map_overlays, stacking, OverlaySelection};
use autoclaim_core::Error;

use crate::cli::{AccountCommand, AnalyzeArgs, ExportArgs, OverlaysArgs, ReportsCommand};
use crate::main_lib::AppState;
use crate::provider::FileAnalysisProvider;

/// Core errors print their user message; the details go to the log.
fn user_facing(err: Error) -> anyhow::Error {
    tracing::error!("{}", err);
    anyhow::anyhow!(err.user_message())
}

/// Reports embed the snapshot in the exported PDF, which takes PNG only.
fn snapshot_mime_type(path: &Path) -> anyhow::Result<&'static str> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => Ok("image/png"),
        _ => anyhow::bail!(
            "Unsupported image {}: only PNG snapshots can be assessed",
            path.display()
        ),
    }
}

fn print_account(account: &CreditAccount) {
    println!("Account:    {}", account.id);
    println!("Credits:    {}", account.credits);
    println!(
        "Onboarding: {}",
        if account.onboarding_complete {
            "complete"
        } else {
            "pending"
        }
    );
}

fn money(state: &AppState, amount: Decimal, currency: CurrencyCode) -> anyhow::Result<String> {
    state
        .converter
        .to_display(amount, currency)
        .map_err(|e| user_facing(e.into()))
}

fn print_assessment(
    state: &AppState,
    assessment: &AssessmentResult,
    currency: CurrencyCode,
) -> anyhow::Result<()> {
    println!("Report:     {}", assessment.id);
    println!("Vehicle:    {}", assessment.vehicle_type);
    println!(
        "Date:       {}",
        assessment.created_at.format("%Y-%m-%d %H:%M")
    );
    println!(
        "Confidence: {:.0}%",
        assessment.confidence_score * 100.0
    );
    println!("Summary:    {}", assessment.summary);
    println!();

    if assessment.damages.is_empty() {
        println!("No damage was detected.");
    }
    for damage in &assessment.damages {
        println!(
            "[{}] {} ({}) - {}",
            damage.id,
            damage.damage_type,
            damage.severity,
            money(state, damage.estimated_cost, currency)?
        );
        println!("    {}", damage.description);
        println!(
            "    Labor: {}",
            money(state, damage.repair_costs.labor, currency)?
        );
        for (index, part) in damage.repair_costs.parts.iter().enumerate() {
            let marker = if index == damage.repair_costs.best_option_index {
                " *"
            } else {
                ""
            };
            println!(
                "    - {}: {}{}{}",
                part.kind.report_label(),
                money(state, part.price, currency)?,
                part.availability
                    .as_deref()
                    .map(|a| format!(" ({})", a))
                    .unwrap_or_default(),
                marker
            );
        }
    }

    println!();
    let breakdown: Vec<String> = assessment
        .severity_breakdown()
        .iter()
        .map(|(severity, count)| format!("{}: {}", severity, count))
        .collect();
    println!("Severity:   {}", breakdown.join(", "));
    println!(
        "Total:      {}",
        money(state, assessment.total_estimated_cost, currency)?
    );
    Ok(())
}

fn load_report(state: &AppState, report_id: &str) -> anyhow::Result<SavedReport> {
    state.reports.get_by_id(report_id).map_err(user_facing)
}

pub async fn account(
    state: &AppState,
    command: AccountCommand,
) -> anyhow::Result<()> {
    let account = match command {
        AccountCommand::Create { id, credits } => {
            let new_account = NewCreditAccount {
                id,
                starting_credits: credits,
            };
            state
                .ledger
                .create_account(new_account)
                .await
                .map_err(user_facing)?
        }
        AccountCommand::Show { id } => state.ledger.get_account(&id).map_err(user_facing)?,
        AccountCommand::Onboard { id } => state
            .ledger
            .complete_onboarding(&id)
            .await
            .map_err(user_facing)?,
    };
    print_account(&account);
    Ok(())
}

pub async fn analyze(
    state: &AppState,
    args: AnalyzeArgs,
    default_currency: CurrencyCode,
) -> anyhow::Result<()> {
    let mime_type = snapshot_mime_type(&args.image)?;
    let bytes = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Cannot read image {}", args.image.display()))?;
    let image = ImagePayload::new(bytes, mime_type);

    let provider = Arc::new(FileAnalysisProvider::new(&args.response));
    let service = state.assessment_service(provider);

    let cancel = tokio::signal::ctrl_c()
        .map(|_| tracing::warn!("Interrupted, cancelling the analysis"))
        .boxed();

    let report = service
        .run_assessment_cancellable(&args.account, image, cancel)
        .await
        .map_err(user_facing)?;

    tracing::info!("Saved report {}", report.id());
    print_assessment(state, &report.assessment, args.currency.unwrap_or(default_currency))?;

    let account = state
        .ledger
        .get_account(&args.account)
        .map_err(user_facing)?;
    println!("Credits left: {}", account.credits);
    Ok(())
}

pub fn reports(
    state: &AppState,
    command: ReportsCommand,
    default_currency: CurrencyCode,
) -> anyhow::Result<()> {
    match command {
        ReportsCommand::List { account, currency } => {
            let currency = currency.unwrap_or(default_currency);
            let reports = state
                .reports
                .list_by_account(&account)
                .map_err(user_facing)?;
            if reports.is_empty() {
                println!("No reports for {}", account);
            }
            for report in reports {
                let assessment = &report.assessment;
                println!(
                    "{}  {}  {:<24}  {:>3} findings  {}",
                    assessment.id,
                    assessment.created_at.format("%Y-%m-%d %H:%M"),
                    assessment.vehicle_type,
                    assessment.damages.len(),
                    money(state, assessment.total_estimated_cost, currency)?
                );
            }
        }
        ReportsCommand::Show { id, currency, json } => {
            let report = load_report(state, &id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_assessment(state, &report.assessment, currency.unwrap_or(default_currency))?;
            }
        }
    }
    Ok(())
}

pub fn overlays(state: &AppState, args: OverlaysArgs) -> anyhow::Result<()> {
    let report = load_report(state, &args.id)?;
    let overlays = map_overlays(&report.assessment);

    let mut selection = OverlaySelection::new();
    if let Some(finding_id) = &args.hover {
        selection.enter(finding_id);
    }

    for stacked in stacking(&overlays, &selection) {
        let overlay = stacked.overlay;
        let px = overlay.to_pixels(args.width, args.height);
        let style = overlay.style();
        println!(
            "z={} {:<12} {:<8} top={:.1}% left={:.1}% h={:.1}% w={:.1}%  px=({:.0},{:.0} {:.0}x{:.0})  rgb({},{},{}) opacity={:.1}{}",
            stacked.z_index,
            overlay.finding_id,
            overlay.severity,
            overlay.top_pct,
            overlay.left_pct,
            overlay.height_pct,
            overlay.width_pct,
            px.x,
            px.y,
            px.width,
            px.height,
            style.stroke.r,
            style.stroke.g,
            style.stroke.b,
            stacked.opacity(),
            if stacked.hovered { "  [hovered]" } else { "" }
        );
    }
    Ok(())
}

pub fn export(
    state: &AppState,
    args: ExportArgs,
    default_currency: CurrencyCode,
) -> anyhow::Result<()> {
    let report = load_report(state, &args.id)?;
    let dir = args.out.unwrap_or_else(|| state.export_dir.clone());
    let path = state
        .exporter
        .export(
            &report,
            args.currency.unwrap_or(default_currency),
            &dir,
            chrono::Utc::now(),
        )
        .map_err(user_facing)?;
    println!("{}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_png_snapshots_are_accepted() {
        assert_eq!(snapshot_mime_type(Path::new("car.PNG")).unwrap(), "image/png");
        for name in ["car.jpeg", "car.jpg", "car.webp", "car"] {
            let err = snapshot_mime_type(Path::new(name)).unwrap_err();
            assert!(err.to_string().contains("only PNG"));
        }
    }

    #[test]
    fn test_user_facing_hides_details() {
        let err = user_facing(Error::AnalysisProvider("HTTP 500 from upstream".to_string()));
        assert_eq!(err.to_string(), "Analysis failed, please try again.");
    }
}
