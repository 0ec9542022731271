// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! One user's report session: the loaded dataset, chart count, filters,
//! per-chart overrides, the plan cache and the notices raised along the way.
//!
//! Every step runs sequentially. AI failures degrade to defaults, a chart that
//! cannot be rendered is skipped, and each failure leaves a notice.

use crate::data::{global_filter_columns, DataFormat, Dataset, DatasetNormalizer, RowFilter};
use crate::error::{ConfigError, LoadError, RegenerationError, RekhaError, RenderError, Result};
use crate::export::{write_report, ReportFiles};
use crate::feedback::{FeedbackRecord, FeedbackSink};
use crate::insight::InsightRegenerator;
use crate::llm::{ApiClient, OpenAIClient};
use crate::notice::{Notice, Notifications};
use crate::plan::validator::to_raw_plan;
use crate::plan::{
    PlanBatch, PlanCache, PlanCacheKey, PlanRequester, PlanValidator, RawChartPlan, ResolvedChartConfig, Rgb,
};
use crate::render::{ChartRenderer, RenderedChart};
use crate::settings::{check_chart_count, AppConfig};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// User overrides for one chart. Unset fields keep the planned value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartControls {
    pub chart_type: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
    pub color: Option<String>,
    /// Allowed values per filter column; columns left out keep every value.
    pub filters: BTreeMap<String, BTreeSet<String>>,
}

pub struct ReportSession {
    id: Uuid,
    settings: AppConfig,
    normalizer: DatasetNormalizer,
    requester: PlanRequester,
    regenerator: InsightRegenerator,
    renderer: ChartRenderer,
    cache: PlanCache,
    dataset: Option<Dataset>,
    chart_count: usize,
    global_filter: RowFilter,
    controls: BTreeMap<usize, ChartControls>,
    notices: Notifications,
}

impl ReportSession {
    pub fn new(settings: AppConfig, client: Arc<dyn ApiClient>) -> std::result::Result<Self, ConfigError> {
        settings.validate()?;
        let requester = PlanRequester::new(Arc::clone(&client))
            .with_profile(settings.llm.plans.clone())
            .with_retry_policy(settings.retry.policy())
            .with_sample_rows(settings.llm.sample_rows);
        let regenerator = InsightRegenerator::new(client)
            .with_profile(settings.llm.insights.clone())
            .with_sample_rows(settings.llm.sample_rows);
        let id = Uuid::new_v4();
        info!(session = %id, "report session started");
        Ok(Self {
            id,
            renderer: ChartRenderer::from_settings(&settings.render),
            chart_count: settings.charts.default_count,
            settings,
            normalizer: DatasetNormalizer::new(),
            requester,
            regenerator,
            cache: PlanCache::new(),
            dataset: None,
            global_filter: RowFilter::new(),
            controls: BTreeMap::new(),
            notices: Notifications::new(),
        })
    }

    /// Builds a session backed by the OpenAI chat-completions client.
    pub fn connect(settings: AppConfig) -> Result<Self> {
        let api_key = settings.require_api_key()?.to_string();
        let client = OpenAIClient::new(
            api_key,
            Some(settings.llm.endpoint.clone()),
            Some(settings.llm.timeout_seconds),
        )
        .map_err(|err| ConfigError::InvalidValue {
            field: "llm".to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self::new(settings, Arc::new(client))?)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &AppConfig {
        &self.settings
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn chart_count(&self) -> usize {
        self.chart_count
    }

    pub fn global_filter(&self) -> &RowFilter {
        &self.global_filter
    }

    pub fn plans(&self) -> Option<&PlanBatch> {
        self.cache.current()
    }

    pub fn notices(&self) -> &Notifications {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    /// Replaces the dataset. On failure the previous dataset stays in place.
    #[instrument(skip(self, bytes), fields(session = %self.id, bytes = bytes.len()))]
    pub fn load_dataset(&mut self, bytes: &[u8], format: DataFormat) -> Result<&Dataset> {
        match self.normalizer.load(bytes, format) {
            Ok(dataset) => Ok(self.install_dataset(dataset)),
            Err(err) => {
                let err = RekhaError::from(err);
                self.notices.report(&err);
                Err(err)
            }
        }
    }

    pub fn load_path(&mut self, path: &Path) -> Result<&Dataset> {
        match self.normalizer.load_path(path) {
            Ok(dataset) => Ok(self.install_dataset(dataset)),
            Err(err) => {
                let err = RekhaError::from(err);
                self.notices.report(&err);
                Err(err)
            }
        }
    }

    fn install_dataset(&mut self, dataset: Dataset) -> &Dataset {
        let columns = global_filter_columns(&dataset, &self.settings.charts.global_filter_columns);
        self.global_filter = RowFilter::present_values(&dataset, columns);
        if let Some(count_column) = dataset.count_column() {
            self.notices.info(format!(
                "No numeric columns found; added '{count_column}' for count-based charts."
            ));
        }
        info!(rows = dataset.row_count(), columns = dataset.column_count(), "dataset loaded");
        self.dataset.insert(dataset)
    }

    fn require_dataset(&self) -> Result<&Dataset> {
        self.dataset.as_ref().ok_or(RekhaError::Load(LoadError::NoDataset))
    }

    pub fn set_chart_count(&mut self, count: usize) -> Result<()> {
        self.chart_count = check_chart_count(count)?;
        Ok(())
    }

    /// Restricts a global filter column to `values`. Returns false when the
    /// column is not a global filter of the current dataset.
    pub fn set_global_filter<I, S>(&mut self, column: &str, values: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.global_filter.contains_column(column) {
            self.notices
                .warn(format!("'{column}' is not available as a global filter; ignoring it."));
            return false;
        }
        self.global_filter.select(column, values);
        true
    }

    /// Overrides chart `index` (0-based).
    pub fn set_controls(&mut self, index: usize, controls: ChartControls) {
        self.controls.insert(index, controls);
    }

    pub fn clear_controls(&mut self) {
        self.controls.clear();
    }

    /// Plans for the current dataset and chart count, asking the AI service
    /// only when the sample or the count changed since the last request.
    pub async fn ensure_plans(&mut self) -> Result<&PlanBatch> {
        let dataset = self
            .dataset
            .as_ref()
            .ok_or(RekhaError::Load(LoadError::NoDataset))?;
        let key = match self.requester.sample_csv(dataset) {
            Ok(sample) => {
                let key = PlanCacheKey::new(&sample, self.chart_count);
                if !self.cache.retain_if(&key) {
                    let batch = self
                        .requester
                        .request(dataset, &sample, self.chart_count, &mut self.notices)
                        .await;
                    self.cache.insert(key.clone(), batch);
                }
                key
            }
            Err(_) => {
                // request_for reports the sampling failure and falls back.
                let batch = self
                    .requester
                    .request_for(dataset, self.chart_count, &mut self.notices)
                    .await;
                let key = PlanCacheKey::new("", self.chart_count);
                self.cache.insert(key.clone(), batch);
                key
            }
        };
        self.cache
            .get(&key)
            .ok_or(RekhaError::Load(LoadError::NoDataset))
    }

    fn validator<'a>(settings: &AppConfig, dataset: &'a Dataset) -> PlanValidator<'a> {
        let validator = PlanValidator::new(dataset).with_filter_cardinality(settings.charts.filter_max_cardinality);
        match Rgb::parse_hex(&settings.charts.default_color) {
            Ok(color) => validator.with_default_color(color),
            Err(_) => validator,
        }
    }

    /// Resolves every cached plan, applying any per-chart overrides.
    pub fn resolved_configs(&mut self) -> Result<Vec<ResolvedChartConfig>> {
        let dataset = self.require_dataset()?;
        let batch = self.cache.current().ok_or(RekhaError::Load(LoadError::NoDataset))?;
        let validator = Self::validator(&self.settings, dataset);
        let mut warnings = Vec::new();
        let configs = batch
            .plans
            .iter()
            .enumerate()
            .map(|(index, plan)| match self.controls.get(&index) {
                Some(controls) => apply_controls(&validator, plan, controls, index + 1, &mut warnings),
                None => validator.resolve(plan),
            })
            .collect();
        for warning in warnings {
            self.notices.warn(warning);
        }
        Ok(configs)
    }

    /// Rows of the dataset that pass the global filter and the chart's own filters.
    pub fn chart_slice(&self, config: &ResolvedChartConfig) -> Result<Dataset> {
        let dataset = self.require_dataset()?;
        Ok(config.filters.apply(&self.global_filter.apply(dataset)))
    }

    /// Renders every planned chart. Charts that fail are skipped with a notice.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn render_all(&mut self) -> Result<Vec<RenderedChart>> {
        self.ensure_plans().await?;
        let configs = self.resolved_configs()?;
        let insights: Vec<String> = self
            .cache
            .current()
            .map(|batch| batch.insights.clone())
            .unwrap_or_default();
        let mut rendered = Vec::with_capacity(configs.len());
        for (index, config) in configs.iter().enumerate() {
            let slice = self.chart_slice(config)?;
            let insight = insights.get(index).map_or("", String::as_str);
            match self.renderer.render(index, config, &slice, insight) {
                Ok(chart) => {
                    for warning in &chart.warnings {
                        self.notices.warn(warning.clone());
                    }
                    rendered.push(chart);
                }
                Err(RenderError::EmptySlice { chart }) => {
                    self.notices.warn(format!(
                        "Chart {chart} has no data after filtering. Please adjust filters."
                    ));
                }
                Err(err) => {
                    self.notices.warn(format!("Chart {} failed: {err}", index + 1));
                }
            }
        }
        info!(planned = configs.len(), rendered = rendered.len(), "charts rendered");
        Ok(rendered)
    }

    /// Asks for a fresh insight for chart `index` (0-based) and stores it in the
    /// plan cache. On failure the previous insight is kept and returned.
    pub async fn regenerate_insight(&mut self, index: usize) -> Result<String> {
        self.ensure_plans().await?;
        let configs = self.resolved_configs()?;
        let config = configs
            .get(index)
            .ok_or(RegenerationError::UnknownChart { index: index + 1 })?;
        let slice = self.chart_slice(config)?;
        let previous = self
            .cache
            .current()
            .map(|batch| batch.insight(index).to_string())
            .unwrap_or_default();
        let insight = self
            .regenerator
            .regenerate_or_keep(index + 1, config, &slice, &previous, &mut self.notices)
            .await;
        if let Some(batch) = self.cache.current_mut() {
            if let Some(slot) = batch.insights.get_mut(index) {
                slot.clone_from(&insight);
            }
        }
        Ok(insight)
    }

    /// Regenerates each listed chart's insight in turn. A chart missing from the
    /// current plan becomes a warning and the remaining charts still run.
    pub async fn regenerate_insights(&mut self, indices: &[usize]) -> Result<()> {
        for &index in indices {
            match self.regenerate_insight(index).await {
                Ok(_) => {}
                Err(RekhaError::Regeneration(err)) => {
                    self.notices.warn(format!("Skipping insight regeneration: {err}"));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Writes the slide deck, PDF and chart images for `charts` into `dir`.
    pub fn export(&mut self, charts: &[RenderedChart], dir: &Path) -> Result<ReportFiles> {
        write_report(charts, dir).map_err(|err| {
            let err = RekhaError::from(err);
            self.notices.report(&err);
            err
        })
    }

    pub fn submit_feedback(&mut self, sink: &dyn FeedbackSink, email: &str, feedback: Option<&str>) -> Result<()> {
        let outcome = FeedbackRecord::new(email, self.chart_count, feedback).and_then(|record| sink.append(&record));
        match outcome {
            Ok(()) => {
                self.notices.info("Thank you for your feedback!");
                Ok(())
            }
            Err(err) => {
                let err = RekhaError::from(err);
                self.notices.report(&err);
                Err(err)
            }
        }
    }
}

/// Merges overrides into the planned fields and resolves the result through
/// the validator, so overridden charts obey the same rules as planned ones.
fn apply_controls(
    validator: &PlanValidator<'_>,
    plan: &RawChartPlan,
    controls: &ChartControls,
    chart_number: usize,
    warnings: &mut Vec<String>,
) -> ResolvedChartConfig {
    let merged = RawChartPlan {
        chart_type: controls.chart_type.clone().or_else(|| plan.chart_type.clone()),
        x: controls.x.clone().or_else(|| plan.x.clone()),
        y: controls.y.clone().or_else(|| plan.y.clone()),
        insight: plan.insight.clone(),
    };
    let mut config = validator.resolve(&merged);
    if let Some(raw) = &controls.color {
        match Rgb::parse_hex(raw) {
            Ok(color) => config.color = color,
            Err(err) => warnings.push(format!("Chart {chart_number}: {err}; using the default color.")),
        }
    }
    for (column, values) in &controls.filters {
        if config.filters.contains_column(column) {
            config.filters.select(column.clone(), values.iter().cloned());
        } else {
            warnings.push(format!(
                "Chart {chart_number}: '{column}' cannot be used as a chart filter; ignoring it."
            ));
        }
    }
    config
}

/// The plan a resolved chart would round-trip to, for display and overrides files.
pub fn controls_for(config: &ResolvedChartConfig) -> ChartControls {
    let plan = to_raw_plan(config, "");
    ChartControls {
        chart_type: plan.chart_type,
        x: plan.x,
        y: plan.y,
        color: Some(config.color.to_hex()),
        filters: config
            .filters
            .columns()
            .filter_map(|column| {
                config
                    .filters
                    .allowed(column)
                    .map(|values| (column.to_string(), values.clone()))
            })
            .collect(),
    }
}
