/*!
# Work Order Cost Breakdown

A small web dashboard that turns an Excel export of work-order time entries
into a cost report, and exports a pixel-accurate PDF of that report.

## Overview

The user uploads a workbook with at least a **Type** and an **Hours** column
(case-insensitive, `Hrs`/`Time`/`Duration Hours` are accepted too). The
dashboard aggregates hours per Type, prices them at an adjustable labor rate
and shows KPIs, charts and a breakdown table. When the sheet has a
**Production Date** column the user can pick one or more days to report on.

"Export PDF" loads the printable variant of the very same page in a headless
Chromium and prints it as one long page, so the PDF matches what is on
screen.

## Architecture

### Request flow
1. `POST /upload` stores the workbook as `<upload_dir>/<uuid>.xlsx`
2. `GET /?upload=<uuid>` reads it and renders the interactive dashboard
3. `GET /export/pdf?...` builds the printable URL (`print=1`, fixed `width`),
   waits in the browser for the `#report-ready` marker, measures the page
   and prints it to a single PDF page
4. `GET /export/xlsx` and `GET /export/csv` download the breakdown table

### Core Components
- Workbook Loader - Header normalization and row parsing with calamine
- Date Selection - First-class set of production dates
- Report Builder - Aggregation, costs, KPIs and number formatting
- Charts - Fixed-size SVG bar charts drawn with plotters
- Upload Store - Atomic per-upload files keyed by a generated UUID
- Capture - Headless Chromium driven through the DevTools protocol

## Modules

- **loader**: Reading work entries out of an uploaded workbook
- **selection**: Production date selection
- **report**: Breakdown table, KPIs and formatting
- **graph**: Chart rendering
- **downloader**: Breakdown export (XLSX, CSV)
- **saving**: Upload storage
- **view**: Query parameters and dashboard templates (web)
- **capture**: Printable URL and PDF capture (web)
- **config**: Flags and environment variables (web)
- **error**: HTTP error mapping (web)
- **app**: Routing (web)

## REST API Endpoints

- `/` - Dashboard (`upload`, `print`, `width`, `rate`, repeated `date`)
- `/upload` - Multipart upload of the workbook (field `workbook`)
- `/export/pdf` - PDF capture of the printable view
- `/export/xlsx`, `/export/csv` - Breakdown downloads
- `/health` - Liveness probe
*/

pub mod downloader;
pub mod graph;
pub mod loader;
pub mod report;
pub mod saving;
pub mod selection;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod capture;
#[cfg(feature = "web")]
pub mod config;
#[cfg(feature = "web")]
pub mod error;
#[cfg(feature = "web")]
pub mod view;

/// Re-export the core types to make them easier to use
pub use loader::{WorkEntry, WorkbookError, load_entries};
pub use report::{Breakdown, Report};
pub use saving::{UploadId, UploadStore};
pub use selection::DateSelection;
