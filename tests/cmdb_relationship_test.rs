use anyhow::Result;
use httpmock::prelude::*;
use serde_json::{json, Value};
use snow_itsm::app::modules::CmdbRelationshipModule;
use snow_itsm::{ModuleArgs, ModuleEngine};

fn module_args(server: &MockServer, state: &str, check_mode: bool) -> Result<ModuleArgs> {
    Ok(ModuleArgs::from_value(json!({
        "instance": {
            "host": server.base_url(),
            "username": "admin",
            "password": "secret",
        },
        "state": state,
        "relationship_name": "Depends on::Used by",
        "relationship_type": "ci_downstream",
        "parent_ci_name": "PAYROLL",
        "parent_ci_class_name": "cmdb_ci_service_discovered",
        "child_ci_name_list": ["APP1", "APP2"],
        "child_ci_class_name": "cmdb_ci_appl",
        "_ansible_check_mode": check_mode,
    }))?)
}

/// Relationship type, parent and two children; only APP1 is already related.
fn mock_topology(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/api/now/cmdbrelation/types");
        then.status(200).json_body(json!({"result": {
            "types": "[{\"name\":\"Runs on::Runs\",\"sys_id\":\"t0\"},{\"name\":\"Depends on::Used by\",\"sys_id\":\"t1\"}]"
        }}));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/now/table/cmdb_ci_service_discovered")
            .query_param("name", "PAYROLL");
        then.status(200)
            .json_body(json!({"result": [{"name": "PAYROLL", "sys_id": "p1"}]}));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/now/table/cmdb_ci_appl")
            .query_param("sysparm_query", "name=APP1^ORname=APP2");
        then.status(200).json_body(json!({"result": [
            {"name": "APP1", "sys_id": "c1"},
            {"name": "APP2", "sys_id": "c2"}
        ]}));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/now/table/cmdb_rel_ci")
            .query_param("sysparm_query", "child=c1^parent=p1^type=t1");
        then.status(200).json_body(json!({"result": [
            {"sys_id": "r1", "child": "c1", "parent": "p1", "type": "t1"}
        ]}));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/now/table/cmdb_rel_ci")
            .query_param("sysparm_query", "child=c2^parent=p1^type=t1");
        then.status(200).json_body(json!({"result": []}));
    });
}

#[tokio::test]
async fn test_present_creates_missing_relations() -> Result<()> {
    let server = MockServer::start();
    mock_topology(&server);
    let add = server.mock(|when, then| {
        when.method(POST)
            .path("/api/now/cmdbrelation/add-rels")
            .body_contains("isSuggestedRelationship")
            .body_contains("c2");
        then.status(200).json_body(json!({"result": {
            "message": "{\"status\":\"OK\",\"message\":\"1 relationship created\"}"
        }}));
    });

    let output = ModuleEngine::new(CmdbRelationshipModule)
        .run(&module_args(&server, "present", false)?)
        .await;

    add.assert();
    assert!(!output.is_failed(), "{:?}", output.msg);
    assert!(output.changed);
    assert_eq!(output.fields["relations_requested_changes"], json!(2));
    assert_eq!(output.fields["relations_created"], json!(1));
    assert_eq!(output.fields["relations_changed_detail"][0]["child"], json!("APP2"));
    assert_eq!(
        output.fields["relations_create_api_result"]["status"],
        json!("OK")
    );
    assert_eq!(output.msg.as_deref(), Some("1 relationship created"));
    Ok(())
}

#[tokio::test]
async fn test_absent_deletes_existing_relations() -> Result<()> {
    let server = MockServer::start();
    mock_topology(&server);
    let delete = server.mock(|when, then| {
        when.method(DELETE)
            .path("/api/now/cmdbrelation/delete-rels")
            .query_param("sysIds", "r1")
            .query_param("type", "cmdb_ci");
        then.status(200).json_body(json!({"result": {
            "message": {"status": "OK", "message": "1 relationship deleted"}
        }}));
    });

    let output = ModuleEngine::new(CmdbRelationshipModule)
        .run(&module_args(&server, "absent", false)?)
        .await;

    delete.assert();
    assert!(output.changed);
    assert_eq!(output.fields["relations_deleted"], json!(1));
    assert_eq!(output.fields["relations_changed_detail"][0]["sys_id"], json!("r1"));
    Ok(())
}

#[tokio::test]
async fn test_api_failure_is_reported() -> Result<()> {
    let server = MockServer::start();
    mock_topology(&server);
    server.mock(|when, then| {
        when.method(POST).path("/api/now/cmdbrelation/add-rels");
        then.status(200).json_body(json!({"result": {
            "message": "{\"status\":\"ERROR\",\"message\":\"type not allowed\"}"
        }}));
    });

    let output = ModuleEngine::new(CmdbRelationshipModule)
        .run(&module_args(&server, "present", false)?)
        .await;

    assert!(output.is_failed());
    assert_eq!(output.fields["relations_created"], json!(0));
    assert_eq!(
        output.msg.as_deref(),
        Some("Error creating relationship: type not allowed")
    );
    Ok(())
}

#[tokio::test]
async fn test_check_mode_reports_without_calling_api() -> Result<()> {
    let server = MockServer::start();
    mock_topology(&server);
    let add = server.mock(|when, then| {
        when.method(POST);
        then.status(500);
    });

    let output = ModuleEngine::new(CmdbRelationshipModule)
        .run(&module_args(&server, "present", true)?)
        .await;

    add.assert_hits(0);
    assert!(output.changed);
    assert_eq!(
        output.fields["relations_changed_detail"].as_array().map(Vec::len),
        Some(1)
    );
    Ok(())
}

#[tokio::test]
async fn test_unknown_relationship_type_fails() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/now/cmdbrelation/types");
        then.status(200).json_body(json!({"result": {"types": []}}));
    });

    let output = ModuleEngine::new(CmdbRelationshipModule)
        .run(&module_args(&server, "present", false)?)
        .await;

    assert!(output.is_failed());
    assert_eq!(
        output.msg.as_deref(),
        Some("Error getting relationship id: Depends on::Used by")
    );
    assert_eq!(output.fields.get("relations_created"), None::<&Value>);
    Ok(())
}
