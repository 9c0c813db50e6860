//! Per-user aggregation over moderation requests.

use std::collections::BTreeMap;

use crate::models::{AnalyticsSummary, RequestStatus, UserRequestRow};

/// Build the analytics summary for `user_email` from its joined request rows.
///
/// Returns `None` when there are no rows; callers turn that into a 404 rather
/// than reporting a zero-filled summary.
pub fn summarize(user_email: &str, rows: &[UserRequestRow]) -> Option<AnalyticsSummary> {
    if rows.is_empty() {
        return None;
    }

    let mut content_type_breakdown = BTreeMap::new();
    let mut classification_breakdown = BTreeMap::new();
    let mut status_breakdown = BTreeMap::new();
    let mut confidence_sum = 0.0;
    let mut confidence_count = 0u32;

    for row in rows {
        *content_type_breakdown.entry(row.content_type).or_insert(0) += 1;
        *status_breakdown.entry(row.status).or_insert(0) += 1;

        if let Some(classification) = row.classification {
            *classification_breakdown.entry(classification).or_insert(0) += 1;
        }

        if row.status == RequestStatus::Completed {
            if let Some(confidence) = row.confidence {
                confidence_sum += confidence;
                confidence_count += 1;
            }
        }
    }

    let average_confidence =
        (confidence_count > 0).then(|| confidence_sum / f64::from(confidence_count));

    Some(AnalyticsSummary {
        user_email: user_email.to_string(),
        total_requests: rows.len() as i64,
        content_type_breakdown,
        classification_breakdown,
        status_breakdown,
        average_confidence,
        first_request_date: rows.iter().map(|r| r.created_at).min(),
        last_request_date: rows.iter().map(|r| r.created_at).max(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classification, ContentType};
    use chrono::{Duration, TimeZone, Utc};

    fn row(
        content_type: ContentType,
        status: RequestStatus,
        minutes: i64,
        classification: Option<Classification>,
        confidence: Option<f64>,
    ) -> UserRequestRow {
        UserRequestRow {
            content_type,
            status,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
                + Duration::minutes(minutes),
            classification,
            confidence,
        }
    }

    #[test]
    fn no_rows_yields_none() {
        assert!(summarize("nobody@x.com", &[]).is_none());
    }

    #[test]
    fn text_completed_and_image_failed() {
        let rows = vec![
            row(
                ContentType::Text,
                RequestStatus::Completed,
                0,
                Some(Classification::Appropriate),
                Some(0.9),
            ),
            row(ContentType::Image, RequestStatus::Failed, 5, None, None),
        ];

        let summary = summarize("a@x.com", &rows).unwrap();
        assert_eq!(summary.user_email, "a@x.com");
        assert_eq!(summary.total_requests, 2);
        assert_eq!(summary.content_type_breakdown[&ContentType::Text], 1);
        assert_eq!(summary.content_type_breakdown[&ContentType::Image], 1);
        assert_eq!(summary.classification_breakdown.len(), 1);
        assert_eq!(
            summary.classification_breakdown[&Classification::Appropriate],
            1
        );
        assert_eq!(summary.status_breakdown[&RequestStatus::Completed], 1);
        assert_eq!(summary.status_breakdown[&RequestStatus::Failed], 1);
        assert!(!summary.status_breakdown.contains_key(&RequestStatus::Pending));
        assert_eq!(summary.average_confidence, Some(0.9));
        assert_eq!(summary.first_request_date, Some(rows[0].created_at));
        assert_eq!(summary.last_request_date, Some(rows[1].created_at));
    }

    #[test]
    fn breakdown_totals_are_consistent() {
        let rows = vec![
            row(
                ContentType::Text,
                RequestStatus::Completed,
                30,
                Some(Classification::Inappropriate),
                Some(0.95),
            ),
            row(
                ContentType::Text,
                RequestStatus::Completed,
                10,
                Some(Classification::Appropriate),
                Some(0.85),
            ),
            row(ContentType::Image, RequestStatus::Pending, 20, None, None),
            row(
                ContentType::Image,
                RequestStatus::Completed,
                0,
                Some(Classification::Appropriate),
                None,
            ),
        ];

        let summary = summarize("b@x.com", &rows).unwrap();
        let status_total: i64 = summary.status_breakdown.values().sum();
        let content_total: i64 = summary.content_type_breakdown.values().sum();
        let classified: i64 = summary.classification_breakdown.values().sum();

        assert_eq!(status_total, summary.total_requests);
        assert_eq!(content_total, summary.total_requests);
        assert!(classified <= summary.total_requests);
        assert_eq!(classified, 3);

        let avg = summary.average_confidence.unwrap();
        assert!((avg - 0.9).abs() < 1e-9);
        assert!(summary.first_request_date <= summary.last_request_date);
        assert_eq!(summary.first_request_date, Some(rows[3].created_at));
        assert_eq!(summary.last_request_date, Some(rows[0].created_at));
    }

    #[test]
    fn average_is_null_without_completed_confidence() {
        let rows = vec![
            row(ContentType::Text, RequestStatus::Failed, 0, None, None),
            row(
                ContentType::Text,
                RequestStatus::Completed,
                1,
                Some(Classification::Appropriate),
                None,
            ),
        ];
        let summary = summarize("c@x.com", &rows).unwrap();
        assert_eq!(summary.average_confidence, None);
        assert!(summary.first_request_date.is_some());
        assert!(summary.last_request_date.is_some());
    }

    #[test]
    fn breakdowns_serialize_with_lowercase_keys() {
        let rows = vec![row(
            ContentType::Text,
            RequestStatus::Completed,
            0,
            Some(Classification::Appropriate),
            Some(0.85),
        )];
        let json = serde_json::to_value(summarize("a@x.com", &rows).unwrap()).unwrap();
        assert_eq!(json["content_type_breakdown"], serde_json::json!({"text": 1}));
        assert_eq!(json["status_breakdown"], serde_json::json!({"completed": 1}));
        assert_eq!(
            json["classification_breakdown"],
            serde_json::json!({"appropriate": 1})
        );
    }
}
