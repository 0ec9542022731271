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

pub mod data;
pub mod error;
pub mod export;
pub mod feedback;
pub mod insight;
pub mod llm;
pub mod notice;
pub mod plan;
pub mod render;
pub mod session;
pub mod settings;

pub use data::{DataFormat, Dataset, DatasetNormalizer, RowFilter};
pub use error::{
    ConfigError, ErrorSeverity, ExportError, FeedbackError, LoadError, PlanError, RegenerationError,
    RekhaError, RenderError, Result,
};
pub use export::{write_report, ReportFiles};
pub use feedback::{CsvFeedbackStore, FeedbackRecord, FeedbackSink};
pub use insight::InsightRegenerator;
pub use llm::{ApiClient, OpenAIClient, RetryPolicy};
pub use notice::{Notice, Notifications};
pub use plan::{ChartKind, PlanBatch, PlanRequester, PlanSource, PlanValidator, RawChartPlan, ResolvedChartConfig, YAxis};
pub use render::{ChartRenderer, RenderedChart};
pub use session::{ChartControls, ReportSession};
pub use settings::AppConfig;
