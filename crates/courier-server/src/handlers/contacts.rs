use std::collections::HashMap;
use std::sync::Arc;

use courier_core::records::RegistrationResult;
use courier_core::{CallContext, SessionId};
use serde::Serialize;

use super::{respond, session_param, HandlerState};
use crate::errors::RequestError;
use crate::mappers::{self, PhoneInfo};
use crate::rpc::{self, RpcResponse};

#[derive(Debug, Serialize)]
pub struct CheckPhonesResult {
    pub infos: Vec<PhoneInfo>,
}

/// Prefix `+` unless already present. Nothing else is checked.
pub fn normalize_phone(phone: &str) -> String {
    if phone.starts_with('+') {
        phone.to_string()
    } else {
        format!("+{phone}")
    }
}

/// Batched registration check. One upstream call for the whole list; the
/// output has exactly one entry per input phone, in input order. A phone the
/// upstream has no row for fails the request.
pub async fn check_phones(
    state: &HandlerState,
    ctx: &CallContext,
    session: &SessionId,
    phones: &[String],
) -> Result<Vec<PhoneInfo>, RequestError> {
    let conn = state.resolve(session)?;
    if phones.is_empty() {
        return Ok(Vec::new());
    }

    let normalized: Vec<String> = phones.iter().map(|p| normalize_phone(p)).collect();
    let results = ctx.run(conn.check_registration(ctx, &normalized)).await?;

    // Upstream rows come back in no particular order; match them by query.
    let by_query: HashMap<&str, &RegistrationResult> =
        results.iter().map(|r| (r.query.as_str(), r)).collect();

    normalized
        .iter()
        .map(|phone| {
            by_query
                .get(phone.as_str())
                .map(|result| mappers::to_phone_info(phone, result))
                .ok_or_else(|| {
                    RequestError::Upstream(format!(
                        "registration check returned no result for {phone}"
                    ))
                })
        })
        .collect()
}

pub(super) async fn rpc_check_phones(
    state: &Arc<HandlerState>,
    params: &serde_json::Value,
    id: Option<serde_json::Value>,
    ctx: &CallContext,
) -> RpcResponse {
    let result = async {
        let session = session_param(params)?;
        let phones = rpc::require_str_array(params, "phones").map_err(RequestError::Validation)?;
        let infos = check_phones(state, ctx, &session, &phones).await?;
        Ok::<_, RequestError>(CheckPhonesResult { infos })
    }
    .await;
    respond(id, result)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::tests::{call, session, setup, SESSION};
    use super::*;
    use courier_core::{Address, MockCall, MockConnection};
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn registered(query: &str, user: &str) -> RegistrationResult {
        RegistrationResult {
            query: query.into(),
            address: Some(Address::new(user, "s.whatsapp.net")),
            is_registered: true,
        }
    }

    fn unregistered(query: &str) -> RegistrationResult {
        RegistrationResult {
            query: query.into(),
            address: None,
            is_registered: false,
        }
    }

    #[test]
    fn normalize_adds_exactly_one_plus() {
        assert_eq!(normalize_phone("15551234567"), "+15551234567");
        assert_eq!(normalize_phone("+15551234567"), "+15551234567");
        assert_eq!(normalize_phone("++1"), "++1");
        assert_eq!(normalize_phone(""), "+");
        assert_eq!(normalize_phone("1 (555) 123"), "+1 (555) 123");
    }

    #[tokio::test]
    async fn check_phones_end_to_end() {
        let (state, mock) = setup(MockConnection::new().with_registration(Ok(vec![
            registered("+15551234567", "15551234567"),
            unregistered("+15559999999"),
        ])));

        let resp = call(
            &state,
            "contacts.checkPhones",
            json!({"session": SESSION, "phones": ["15551234567", "+15559999999"]}),
        )
        .await;
        assert!(resp.success, "{:?}", resp.error);
        assert_eq!(
            resp.result.unwrap(),
            json!({"infos": [
                {"phone": "+15551234567", "jid": "15551234567@s.whatsapp.net", "registered": true},
                {"phone": "+15559999999", "jid": "", "registered": false},
            ]})
        );
        assert_eq!(
            mock.calls(),
            vec![MockCall::CheckRegistration {
                phones: vec!["+15551234567".into(), "+15559999999".into()],
            }]
        );
    }

    #[tokio::test]
    async fn output_preserves_length_and_order() {
        let phones: Vec<String> = (0..25).map(|i| format!("1555000{i:04}")).collect();
        // Default mock registration echoes each phone back unregistered.
        let (state, mock) = setup(MockConnection::new());
        let out = check_phones(&state, &CallContext::background(), &session(), &phones)
            .await
            .unwrap();
        assert_eq!(out.len(), phones.len());
        for (info, phone) in out.iter().zip(&phones) {
            assert_eq!(info.phone, format!("+{phone}"));
            assert!(!info.registered);
        }
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn empty_list_skips_upstream() {
        let (state, mock) = setup(MockConnection::new());
        let out = check_phones(&state, &CallContext::background(), &session(), &[])
            .await
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_phone_is_forwarded_as_plus() {
        let (state, mock) = setup(MockConnection::new());
        let out = check_phones(&state, &CallContext::background(), &session(), &["".to_string()])
            .await
            .unwrap();
        assert_eq!(out[0].phone, "+");
        assert_eq!(mock.calls(), vec![MockCall::CheckRegistration { phones: vec!["+".into()] }]);
    }

    #[tokio::test]
    async fn reordered_results_are_matched_by_query() {
        let (state, _mock) = setup(
            MockConnection::new()
                .with_registration(Ok(vec![unregistered("+2"), registered("+1", "1")])),
        );
        let phones = ["1".to_string(), "2".to_string()];
        let out = check_phones(&state, &CallContext::background(), &session(), &phones)
            .await
            .unwrap();
        assert_eq!(
            out,
            vec![
                PhoneInfo {
                    phone: "+1".into(),
                    jid: "1@s.whatsapp.net".into(),
                    registered: true,
                },
                PhoneInfo {
                    phone: "+2".into(),
                    jid: String::new(),
                    registered: false,
                },
            ]
        );
    }

    #[tokio::test]
    async fn duplicate_phones_share_one_result() {
        let (state, _mock) =
            setup(MockConnection::new().with_registration(Ok(vec![registered("+1", "1")])));
        let phones = ["1".to_string(), "+1".to_string()];
        let out = check_phones(&state, &CallContext::background(), &session(), &phones)
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|info| info.phone == "+1" && info.registered));
    }

    #[tokio::test]
    async fn missing_result_is_upstream_error() {
        let (state, _mock) =
            setup(MockConnection::new().with_registration(Ok(vec![unregistered("+1")])));
        let phones = ["1".to_string(), "2".to_string()];
        let err = check_phones(&state, &CallContext::background(), &session(), &phones)
            .await
            .unwrap_err();
        match err {
            RequestError::Upstream(msg) => assert!(msg.contains("+2"), "{msg}"),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn batch_failure_fails_whole_request() {
        let failure = courier_core::ProtocolError::Other("rate-overlimit".into());
        let (state, _mock) = setup(MockConnection::new().with_registration(Err(failure)));
        let params = json!({"session": SESSION, "phones": ["1", "2"]});
        let resp = call(&state, "contacts.checkPhones", params).await;
        assert_eq!(resp.error_code(), Some("UPSTREAM_ERROR"));
        assert_eq!(resp.error.unwrap().message, "rate-overlimit");
        assert!(resp.result.is_none());
    }

    #[tokio::test]
    async fn non_string_phone_is_invalid_params() {
        let (state, mock) = setup(MockConnection::new());
        let params = json!({"session": SESSION, "phones": ["1", 2]});
        let resp = call(&state, "contacts.checkPhones", params).await;
        assert_eq!(resp.error_code(), Some("INVALID_PARAMS"));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_surfaced_as_timeout() {
        let (state, _mock) = setup(MockConnection::new().with_delay(Duration::from_secs(30)));
        let ctx = CallContext::with_timeout(CancellationToken::new(), Duration::from_millis(100));
        let err = check_phones(&state, &ctx, &session(), &["1".into()]).await.unwrap_err();
        assert!(matches!(err, RequestError::Timeout(d) if d == Duration::from_millis(100)));
    }
}
