// crates/validator-codegen/src/template.rs
// ============================================================================
// Module: Template Selection and Rendering
// Description: Deterministic template path of the code generator.
// Purpose: Map (strategy_type, signal_type) to a template and render it.
// Dependencies: validator-verify::candidate
// ============================================================================

//! ## Overview
//! Template identifiers live in a small closed set. Selection is a static
//! map from the normalized `(strategy_type, signal_type)` pair; rendering is
//! purely substitutional against a context object derived from the
//! candidate, so identical input always produces byte-identical output.

use validator_verify::CandidateDocument;

// ============================================================================
// SECTION: Template identifiers
// ============================================================================

/// Closed set of template identifiers the deterministic path can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateId {
    /// Momentum / relative-strength rotation strategies.
    Momentum,
    /// Mean-reversion strategies.
    MeanReversion,
    /// Strategies that switch behavior by detected market regime.
    RegimeAdaptive,
    /// Options income (covered call, put spread, etc.) strategies.
    OptionsIncome,
    /// Fallback template for shapes no other template matches closely
    /// enough to select deterministically.
    Generic,
}

impl TemplateId {
    /// Returns the class-name-friendly label used in rendered output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            TemplateId::Momentum => "momentum",
            TemplateId::MeanReversion => "mean_reversion",
            TemplateId::RegimeAdaptive => "regime_adaptive",
            TemplateId::OptionsIncome => "options_income",
            TemplateId::Generic => "generic",
        }
    }
}

// ============================================================================
// SECTION: Selection
// ============================================================================

/// Selects a template for the normalized `(strategy_type, signal_type)` pair.
/// Returns `None` when no template matches, signaling the caller to fall
/// through to the LLM path.
#[must_use]
pub fn select_template(strategy_type: Option<&str>, signal_type: Option<&str>) -> Option<TemplateId> {
    let strategy_type = strategy_type.map(normalize)?;
    let signal_type = signal_type.map(normalize);

    match (strategy_type.as_str(), signal_type.as_deref()) {
        ("momentum_rotation", _) | ("momentum", _) | (_, Some("relative_momentum")) => {
            Some(TemplateId::Momentum)
        }
        ("mean_reversion", _) | (_, Some("mean_reversion")) => Some(TemplateId::MeanReversion),
        ("regime_adaptive", _) | ("regime_switching", _) => Some(TemplateId::RegimeAdaptive),
        ("options_income", _) | ("covered_call", _) | ("put_spread", _) => {
            Some(TemplateId::OptionsIncome)
        }
        _ => None,
    }
}

fn normalize(value: &str) -> String {
    value
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

// ============================================================================
// SECTION: Rendering context
// ============================================================================

/// Fields substituted into a template, derived deterministically from the
/// candidate. Does not include a wall-clock timestamp: the caller supplies
/// one explicitly so rendering stays reproducible in tests.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// PascalCase class name derived from the candidate id.
    pub class_name: String,
    /// Universe symbols, in declaration order.
    pub symbols: Vec<String>,
    /// Strategy parameters, rendered as `key = value` assignment lines.
    pub parameter_lines: Vec<String>,
    /// Caller-supplied render timestamp (RFC3339), embedded as a comment.
    pub generated_at: String,
    /// The candidate's technical entry condition, substituted directly into
    /// `OnData` as a boolean expression. Defaults to always-true when the
    /// candidate declares no technical entry.
    pub entry_condition: String,
    /// Ordered exit paths, each substituted as its own `Liquidate` guard.
    pub exit_paths: Vec<String>,
    /// Declared sizing method, embedded as a comment above the order call.
    pub sizing_method: Option<String>,
    /// Fractional portfolio allocation per position, from `position.sizing`.
    pub allocation: f64,
}

impl RenderContext {
    /// Builds a render context from a candidate document and an explicit
    /// timestamp.
    #[must_use]
    pub fn from_candidate(candidate: &CandidateDocument, generated_at: impl Into<String>) -> Self {
        let class_name = class_name_from_id(candidate.id.as_str());
        let symbols = candidate
            .universe
            .as_ref()
            .map(|u| {
                let mut all = u.symbols.clone();
                all.extend(u.instruments.clone());
                all
            })
            .unwrap_or_default();
        let parameter_lines = render_parameter_lines(&candidate.parameters);
        let entry_condition = candidate
            .entry
            .as_ref()
            .and_then(|entry| entry.technical.as_ref())
            .and_then(|technical| technical.condition.clone())
            .unwrap_or_else(|| "True".to_string());
        let exit_paths = candidate.exit.as_ref().map(|exit| exit.paths.clone()).unwrap_or_default();
        let sizing = candidate.position.as_ref().and_then(|position| position.sizing.as_ref());
        let sizing_method = sizing.and_then(|sizing| sizing.method.clone());
        let allocation = sizing.and_then(|sizing| sizing.allocation.or(sizing.size)).unwrap_or(1.0);
        Self {
            class_name,
            symbols,
            parameter_lines,
            generated_at: generated_at.into(),
            entry_condition,
            exit_paths,
            sizing_method,
            allocation,
        }
    }
}

fn class_name_from_id(id: &str) -> String {
    let mut out = String::new();
    for part in id.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars.map(|c| c.to_ascii_lowercase()));
        }
    }
    if out.is_empty() {
        out.push_str("GeneratedStrategy");
    }
    out
}

fn render_parameter_lines(parameters: &serde_json::Value) -> Vec<String> {
    let Some(map) = parameters.as_object() else {
        return Vec::new();
    };
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|key| {
            let value = &map[key];
            format!("        self.{key} = {}", render_value(value))
        })
        .collect()
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders `template` against `ctx`, producing a complete backtest program.
/// Identical `(template, ctx)` input always produces byte-identical output.
#[must_use]
pub fn render(template: TemplateId, ctx: &RenderContext) -> String {
    let symbols_block = ctx
        .symbols
        .iter()
        .map(|s| format!("        self.AddEquity(\"{s}\", Resolution.DAILY)"))
        .collect::<Vec<_>>()
        .join("\n");
    let symbols_list = ctx.symbols.iter().map(|s| format!("\"{s}\"")).collect::<Vec<_>>().join(", ");
    let parameters_block = ctx.parameter_lines.join("\n");
    let on_data = render_on_data(template, ctx);

    // Deliberately omits SetStartDate/SetEndDate: the driver's date rewriter
    // (validator-driver) is the sole source of window dates, and the
    // template path must contain zero date-setting calls for the rewriter
    // to insert fresh ones per window.
    format!(
        "# Generated by template: {template_label}\n\
         # Generated at: {generated_at}\n\
         class {class_name}(QCAlgorithm):\n\
         \x20   def Initialize(self):\n\
         \x20       self.SetCash(100000)\n\
         \x20       self.SetWarmUp(30)\n\
         \x20       self.symbols = [{symbols_list}]\n\
         {symbols_block}\n\
         {parameters_block}\n\
         \n\
         {on_data}",
        template_label = template.label(),
        generated_at = ctx.generated_at,
        class_name = ctx.class_name,
    )
}

/// Dispatches to the per-template `OnData` body. Each template reads
/// `ctx.entry_condition`/`ctx.exit_paths`/`ctx.sizing_method`/`ctx.allocation`
/// differently, so two candidates with the same template but different
/// entry/exit/position declarations render different trading logic.
fn render_on_data(template: TemplateId, ctx: &RenderContext) -> String {
    match template {
        TemplateId::Momentum => momentum_on_data(ctx),
        TemplateId::MeanReversion => mean_reversion_on_data(ctx),
        TemplateId::RegimeAdaptive => regime_adaptive_on_data(ctx),
        TemplateId::OptionsIncome => options_income_on_data(ctx),
        TemplateId::Generic => generic_on_data(ctx),
    }
}

/// Trailing comment documenting the candidate's declared sizing method.
fn sizing_comment(ctx: &RenderContext) -> String {
    match &ctx.sizing_method {
        Some(method) => format!("# position sizing: {method}"),
        None => "# position sizing: fixed allocation".to_string(),
    }
}

/// Liquidates any invested symbol whose exit path fires. Candidates with no
/// declared exit paths leave positions open until a later entry reversal.
fn exit_block(ctx: &RenderContext) -> String {
    let mut lines = vec![
        "        for symbol in list(self.Portfolio.Keys):".to_string(),
        "            if not self.Portfolio[symbol].Invested:".to_string(),
        "                continue".to_string(),
    ];
    if ctx.exit_paths.is_empty() {
        lines.push("            pass".to_string());
    } else {
        for path in &ctx.exit_paths {
            lines.push(format!("            if {path}:"));
            lines.push("                self.Liquidate(symbol)".to_string());
        }
    }
    lines.join("\n")
}

/// Ranks the universe by price and enters the top-ranked symbol passing the
/// entry condition, rotating out of anything an exit path flags.
fn momentum_on_data(ctx: &RenderContext) -> String {
    format!(
        "    def OnData(self, data):\n\
         \x20       {sizing_comment}\n\
         \x20       ranked = sorted(self.symbols, key=lambda s: self.Securities[s].Price, reverse=True)\n\
         \x20       for symbol in ranked:\n\
         \x20           if not ({entry_condition}):\n\
         \x20               continue\n\
         \x20           self.SetHoldings(symbol, {allocation})\n\
         \x20           break\n\
         {exit_block}\n",
        sizing_comment = sizing_comment(ctx),
        entry_condition = ctx.entry_condition,
        allocation = ctx.allocation,
        exit_block = exit_block(ctx),
    )
}

/// Enters every uninvested symbol whose entry condition fires (a dislocation
/// from the mean), then hands liquidation off to the declared exit paths.
fn mean_reversion_on_data(ctx: &RenderContext) -> String {
    format!(
        "    def OnData(self, data):\n\
         \x20       {sizing_comment}\n\
         \x20       for symbol in self.symbols:\n\
         \x20           if self.Portfolio[symbol].Invested:\n\
         \x20               continue\n\
         \x20           if {entry_condition}:\n\
         \x20               self.SetHoldings(symbol, {allocation})\n\
         {exit_block}\n",
        sizing_comment = sizing_comment(ctx),
        entry_condition = ctx.entry_condition,
        allocation = ctx.allocation,
        exit_block = exit_block(ctx),
    )
}

/// Treats the entry condition as a regime detector: holds the universe while
/// the regime is on, liquidates it the moment the regime flips off.
fn regime_adaptive_on_data(ctx: &RenderContext) -> String {
    format!(
        "    def OnData(self, data):\n\
         \x20       {sizing_comment}\n\
         \x20       regime_on = {entry_condition}\n\
         \x20       for symbol in self.symbols:\n\
         \x20           if regime_on:\n\
         \x20               self.SetHoldings(symbol, {allocation})\n\
         \x20           elif self.Portfolio[symbol].Invested:\n\
         \x20               self.Liquidate(symbol)\n\
         {exit_block}\n",
        sizing_comment = sizing_comment(ctx),
        entry_condition = ctx.entry_condition,
        allocation = ctx.allocation,
        exit_block = exit_block(ctx),
    )
}

/// Sells the nearest-strike contract of each symbol's option chain once the
/// entry condition fires, collecting premium rather than taking a directional
/// equity position.
fn options_income_on_data(ctx: &RenderContext) -> String {
    format!(
        "    def OnData(self, data):\n\
         \x20       {sizing_comment}\n\
         \x20       for symbol in self.symbols:\n\
         \x20           chain = data.OptionChains.get(symbol)\n\
         \x20           if chain is None:\n\
         \x20               continue\n\
         \x20           if not ({entry_condition}):\n\
         \x20               continue\n\
         \x20           contracts = sorted(chain, key=lambda c: c.Strike)\n\
         \x20           if contracts:\n\
         \x20               self.Sell(contracts[0].Symbol, 1)\n\
         {exit_block}\n",
        sizing_comment = sizing_comment(ctx),
        entry_condition = ctx.entry_condition,
        exit_block = exit_block(ctx),
    )
}

/// Fallback body for candidates no closed-list template matched closely
/// enough to drive: documents the entry condition it was not confident
/// enough to act on, and otherwise does nothing.
fn generic_on_data(ctx: &RenderContext) -> String {
    format!(
        "    def OnData(self, data):\n\
         \x20       # unmatched entry condition: {entry_condition}\n\
         \x20       pass\n",
        entry_condition = ctx.entry_condition,
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================
