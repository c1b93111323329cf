/*!
# Fast e-Invoice

A browser-facing viewer for invoice reports and a cryptocurrency market
dashboard, served by an axum web server.

## Overview

Users sign in through an external login endpoint. Signed-in users can open
the invoice report (search, sort, paginate, export to a spreadsheet, open an
invoice PDF) and the coin market dashboard (search by name, sort by rank or
price, expand a coin).

## Architecture

### Data pipeline
- **record**: typed records, normalized from upstream JSON
- **store**: the fetched snapshot and its load status
- **filter**, **sort**, **paginate**: the derived view, `raw → filtered → sorted → paginated`
- **export**: XLSX/CSV artifacts from the filtered and sorted view
- **view**: per-screen `ViewState` reducer and the `ViewController` state machine

### Edges
- **client**: upstream invoice API and public market API
- **session**: explicit session state, login form checks, route guard
- **app**: routing and handlers
- **config**, **logging**, **error**: ambient plumbing

## REST API Endpoints

- `POST /login`, `POST /logout` - Session start and end
- `GET /main` - Available report screens
- `POST /api/{dataset}/load` - Fetch records into the store
- `GET /api/{dataset}/view` - Current derived view
- `POST /api/{dataset}/action` - Apply a view action (search, sort, page, expand)
- `GET /api/{dataset}/export` - Download the filtered and sorted rows
- `GET /api/invoices/{id}/pdf` - Invoice PDF
*/

pub mod app;
pub mod client;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod filter;
pub mod logging;
pub mod paginate;
pub mod record;
pub mod session;
pub mod sort;
pub mod store;
pub mod view;

pub use client::ApiClient;
pub use config::Config;
pub use dataset::Dataset;
pub use error::*;
pub use export::{Artifact, ExportFormat};
pub use record::{Record, Value};
pub use view::{DerivedView, ViewAction, ViewController, ViewState};
