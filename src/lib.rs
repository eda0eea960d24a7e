/*!
# Spreadsheet Visualization Dashboard

A small data dashboard: import a spreadsheet, let the schema be inferred,
edit fields and records, and plot numeric columns as charts.

## Overview

Uploaded CSV, XLSX and XLS files go through an import pipeline that reads the
first sheet into a grid of raw cells, takes the first row as column names and
infers one of five field types for every column from its first few values.
Every cell is then normalized to its column type. The result is shown as a
preview which the user either confirms (replacing the live dataset) or
discards.

The live dataset, its schema and the login flag are kept in a string
key-value store so they survive a restart.

## Architecture

### Data Layer
- **field**: Field types, typed values, raw cells and rows
- **inference**: Type inference from sample values
- **normalize**: Coercion of raw cells to a field type
- **dataset**: Schema and record management

### Import/Export Layer
- **loader**: Upload validation and grid extraction (csv, calamine)
- **import**: Header handling, inference and normalization into a preview
- **downloader**: Template and dataset export (CSV, XLSX)
- **saving**: Gzip-compressed snapshots of the dataset

### Application Layer
- **storage**: Key-value persistence (in-memory and file backed)
- **login**: Demo credentials and server-side sessions
- **workspace**: Application state, import flow and persistence
- **chart**: Projection of the dataset onto chart series
- **config**: Server settings
- **graph**: PNG chart rendering (feature `web`)
- **app**: HTTP routing and middleware (feature `web`)

## REST API Endpoints

- `POST /api/login`, `POST /api/logout`, `GET /api/session` - Session handling
- `GET /api/dataset` - Current schema and records
- `/api/fields`, `/api/rows` - Field and record editing
- `POST /api/import`, `/api/import/confirm`, `/api/import/cancel` - Import flow
- `POST /api/chart`, `POST /api/chart/png` - Chart data and images
- `GET /api/template`, `GET /api/export`, `POST /api/restore` - Downloads and snapshots
*/

pub mod chart;
pub mod config;
pub mod dataset;
pub mod downloader;
pub mod field;
pub mod import;
pub mod inference;
pub mod loader;
pub mod login;
pub mod normalize;
pub mod saving;
pub mod storage;
pub mod workspace;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod graph;

pub use chart::{ChartConfig, ChartData, ChartKind};
pub use dataset::{Dataset, DatasetError};
pub use field::{Field, FieldType, FieldValue, RawValue, Row};
pub use import::{ImportError, ImportPreview};
pub use inference::infer_type;
pub use normalize::normalize;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use workspace::{Workspace, WorkspaceError};
