//! JSON document ingest.
//!
//! Schedule data arrives as an array of document envelopes:
//!
//! ```json
//! { "docId": "...", "docType": "workCenter" | "workOrder", "data": { ... } }
//! ```
//!
//! Instants are ISO-8601 strings with an explicit offset; they are parsed
//! into UTC on ingest so all downstream comparisons work on instants, not
//! strings.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use reflow_core::{MaintenanceWindow, Shift, WorkCenter, WorkOrder};

#[derive(Debug, Deserialize)]
#[serde(tag = "docType")]
enum Document {
    #[serde(rename = "workCenter")]
    WorkCenter {
        #[serde(rename = "docId")]
        doc_id: String,
        data: WorkCenterData,
    },
    #[serde(rename = "workOrder")]
    WorkOrder {
        #[serde(rename = "docId")]
        doc_id: String,
        data: WorkOrderData,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkCenterData {
    name: String,
    #[serde(default)]
    shifts: Vec<ShiftData>,
    #[serde(default)]
    maintenance_windows: Vec<MaintenanceWindowData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShiftData {
    day_of_week: u8,
    start_hour: u8,
    end_hour: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MaintenanceWindowData {
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkOrderData {
    work_order_number: String,
    #[serde(default)]
    manufacturing_order_id: Option<String>,
    work_center_id: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    duration_minutes: i64,
    #[serde(default)]
    is_maintenance: bool,
    #[serde(default)]
    depends_on_work_order_ids: Vec<String>,
}

/// Load work centers and work orders from a document file
pub fn load_documents(path: &Path) -> Result<(Vec<WorkCenter>, Vec<WorkOrder>)> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_documents(&raw)
}

/// Parse a document array into work centers and work orders
pub fn parse_documents(raw: &str) -> Result<(Vec<WorkCenter>, Vec<WorkOrder>)> {
    let documents: Vec<Document> =
        serde_json::from_str(raw).context("parsing schedule documents")?;

    let mut centers = Vec::new();
    let mut orders = Vec::new();

    for document in documents {
        match document {
            Document::WorkCenter { doc_id, data } => {
                let mut center = WorkCenter::new(doc_id).name(data.name);
                for shift in data.shifts {
                    center = center.shift(Shift::new(
                        shift.day_of_week,
                        shift.start_hour,
                        shift.end_hour,
                    ));
                }
                for window in data.maintenance_windows {
                    let mut w = MaintenanceWindow::new(window.start_date, window.end_date);
                    if let Some(reason) = window.reason {
                        w = w.reason(reason);
                    }
                    center = center.maintenance(w);
                }
                centers.push(center);
            }
            Document::WorkOrder { doc_id, data } => {
                let mut order = WorkOrder::new(doc_id)
                    .number(data.work_order_number)
                    .on(data.work_center_id)
                    .window(data.start_date, data.end_date)
                    .duration_minutes(data.duration_minutes);
                if data.is_maintenance {
                    order = order.maintenance();
                }
                for dep in data.depends_on_work_order_ids {
                    order = order.depends_on(dep);
                }
                orders.push(order);
            }
        }
    }

    Ok((centers, orders))
}
