use anyhow::Result;
use httpmock::prelude::*;
use serde_json::json;
use snow_itsm::config::{GrantType, InstanceConfig};
use snow_itsm::core::remap;
use snow_itsm::core::mapper::{get_mapper, request_item_mapping};
use snow_itsm::core::table::{query_of, TableClient};
use snow_itsm::{Client, SnowError};

async fn connect(server: &MockServer) -> Result<Client> {
    let config = InstanceConfig {
        host: server.base_url(),
        username: Some("admin".to_string()),
        password: Some("secret".to_string()),
        client_id: None,
        client_secret: None,
        refresh_token: None,
        grant_type: GrantType::Password,
        timeout: Some(5.0),
    };
    Ok(Client::connect(&config).await?)
}

#[tokio::test]
async fn test_list_records_follows_total_count() -> Result<()> {
    let server = MockServer::start();
    let first = server.mock(|when, then| {
        when.method(GET)
            .path("/api/now/table/sc_req_item")
            .query_param("sysparm_exclude_reference_link", "true")
            .query_param("sysparm_limit", "2")
            .query_param("sysparm_offset", "0");
        then.status(200)
            .header("x-total-count", "3")
            .json_body(json!({"result": [{"sys_id": "1"}, {"sys_id": "2"}]}));
    });
    let second = server.mock(|when, then| {
        when.method(GET)
            .path("/api/now/table/sc_req_item")
            .query_param("sysparm_limit", "2")
            .query_param("sysparm_offset", "2");
        then.status(200)
            .header("x-total-count", "3")
            .json_body(json!({"result": [{"sys_id": "3"}]}));
    });

    let table_client = TableClient::with_batch_size(connect(&server).await?, 2);
    let records = table_client
        .list_records("sc_req_item", &Default::default())
        .await?;

    first.assert();
    second.assert();
    let ids: Vec<_> = records.iter().map(|r| r["sys_id"].clone()).collect();
    assert_eq!(ids, vec![json!("1"), json!("2"), json!("3")]);
    Ok(())
}

#[tokio::test]
async fn test_get_record_match_count() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/now/table/sc_req_item")
            .query_param("number", "RITM1");
        then.status(200)
            .json_body(json!({"result": [{"sys_id": "1"}, {"sys_id": "2"}]}));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/now/table/sc_req_item")
            .query_param("number", "RITM404");
        then.status(200).json_body(json!({"result": []}));
    });

    let table_client = TableClient::new(connect(&server).await?);

    let err = table_client
        .get_record("sc_req_item", &query_of([("number", "RITM1")]), false)
        .await
        .unwrap_err();
    assert!(matches!(err, SnowError::MultipleMatches { count: 2, .. }));

    let missing = table_client
        .get_record("sc_req_item", &query_of([("number", "RITM404")]), false)
        .await?;
    assert!(missing.is_none());

    let err = table_client
        .require_record("sc_req_item", &query_of([("number", "RITM404")]))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "No sc_req_item records match the number=RITM404 query."
    );
    Ok(())
}

#[tokio::test]
async fn test_check_mode_skips_writes() -> Result<()> {
    let server = MockServer::start();
    let writes = server.mock(|when, then| {
        when.path_contains("/api/now/table/sc_req_item");
        then.status(500);
    });

    let table_client = TableClient::new(connect(&server).await?);
    let payload = json!({"short_description": "new"}).as_object().cloned().unwrap();
    let created = table_client
        .create_record("sc_req_item", &payload, true)
        .await?;
    assert_eq!(created, payload);

    let record = json!({"sys_id": "1", "state": "1"}).as_object().cloned().unwrap();
    let updated = table_client
        .update_record("sc_req_item", &record, &payload, true)
        .await?;
    assert_eq!(updated["short_description"], json!("new"));
    assert_eq!(updated["sys_id"], json!("1"));

    table_client.delete_record("sc_req_item", &record, true).await?;
    writes.assert_hits(0);
    Ok(())
}

#[tokio::test]
async fn test_sysparm_query_resolves_references() -> Result<()> {
    let server = MockServer::start();
    let user = server.mock(|when, then| {
        when.method(GET)
            .path("/api/now/table/sys_user")
            .query_param("user_name", "bob");
        then.status(200)
            .json_body(json!({"result": [{"sys_id": "u1", "user_name": "bob"}]}));
    });

    let table_client = TableClient::new(connect(&server).await?);
    let mapper = get_mapper(None, request_item_mapping())?;
    let raw = vec![
        json!({"requested_by": "= bob", "state": "IN Open, Work In Progress"})
            .as_object()
            .cloned()
            .unwrap(),
        json!({"requested_by": "ISEMPTY"}).as_object().cloned().unwrap(),
    ];

    let encoded = remap::sysparm_query(&raw, &table_client, &mapper).await?;

    // the unary condition must not trigger a second lookup
    user.assert_hits(1);
    assert_eq!(encoded, "requested_by=u1^stateIN1,2^NQrequested_byISEMPTY");
    Ok(())
}

#[tokio::test]
async fn test_sysparm_query_reports_unknown_user() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/now/table/sys_user");
        then.status(200).json_body(json!({"result": []}));
    });

    let table_client = TableClient::new(connect(&server).await?);
    let mapper = get_mapper(None, request_item_mapping())?;
    let raw = vec![json!({"requested_by": "= ghost"}).as_object().cloned().unwrap()];

    let err = remap::sysparm_query(&raw, &table_client, &mapper)
        .await
        .unwrap_err();
    assert!(matches!(err, SnowError::NoMatch { .. }));
    Ok(())
}

#[tokio::test]
async fn test_sysparm_query_remaps_every_reference_field() -> Result<()> {
    let server = MockServer::start();
    let group = server.mock(|when, then| {
        when.method(GET)
            .path("/api/now/table/sys_user_group")
            .query_param("name", "Service Desk");
        then.status(200)
            .json_body(json!({"result": [{"sys_id": "g1", "name": "Service Desk"}]}));
    });
    let template = server.mock(|when, then| {
        when.method(GET)
            .path("/api/now/table/std_change_producer_version")
            .query_param("name", "Reboot server");
        then.status(200)
            .json_body(json!({"result": [{"sys_id": "t1", "name": "Reboot server"}]}));
    });

    let table_client = TableClient::new(connect(&server).await?);
    let mapper = get_mapper(None, request_item_mapping())?;
    let raw = vec![
        json!({"assignment_group": "= Service Desk"}).as_object().cloned().unwrap(),
        json!({"template": "!= Reboot server"}).as_object().cloned().unwrap(),
        json!({"type": "= standard", "hold_reason": "= awaiting_caller"})
            .as_object()
            .cloned()
            .unwrap(),
    ];

    let encoded = remap::sysparm_query(&raw, &table_client, &mapper).await?;

    group.assert();
    template.assert();
    assert_eq!(
        encoded,
        "assignment_group=g1\
         ^NQstd_change_producer_version!=t1\
         ^NQon_hold_reason=awaiting_caller^chg_model=standard"
    );
    Ok(())
}

#[tokio::test]
async fn test_renamed_fields_need_no_lookup() -> Result<()> {
    let server = MockServer::start();
    let any_lookup = server.mock(|when, then| {
        when.path_contains("/api/now/table/");
        then.status(500);
    });

    let table_client = TableClient::new(connect(&server).await?);
    let mapper = get_mapper(None, request_item_mapping())?;
    let raw = vec![json!({"type": "LIKE normal", "hold_reason": "ISNOTEMPTY"})
        .as_object()
        .cloned()
        .unwrap()];

    let encoded = remap::sysparm_query(&raw, &table_client, &mapper).await?;

    any_lookup.assert_hits(0);
    assert_eq!(encoded, "on_hold_reasonISNOTEMPTY^chg_modelLIKEnormal");
    Ok(())
}
