//! Built-in task schemas for every supported source.

use crate::source::SourceKind;
use debugkit_core::{ParamSpec, ParamType, TaskSchema};

fn req(name: &str, kind: ParamType) -> ParamSpec {
    ParamSpec::required(name, kind)
}

fn opt(name: &str, kind: ParamType) -> ParamSpec {
    ParamSpec::optional(name, kind)
}

fn task(task_type: &str, params: Vec<ParamSpec>) -> TaskSchema {
    TaskSchema::new(task_type, params)
}

fn sql_query(with_database: bool) -> TaskSchema {
    let mut params = vec![req("query", ParamType::String)];
    if with_database {
        params.push(opt("database", ParamType::String));
    }
    params.push(opt("timeout", ParamType::Integer));
    task("sql_query", params)
}

/// Built-in tasks of a source, in declaration order
#[must_use]
pub fn builtin_tasks(source: SourceKind) -> Vec<TaskSchema> {
    use ParamType::{Boolean, Integer, Object, ObjectList, String, StringList};

    match source {
        SourceKind::Grafana => vec![
            task(
                "datasource_query_execution",
                vec![
                    req("datasource_uid", String),
                    req("query_expression", String),
                    opt("query_type", String).with_default("PromQL"),
                    opt("interval", Integer),
                ],
            ),
            task(
                "query_prometheus",
                vec![req("datasource_uid", String), req("query", String), opt("interval", Integer)],
            ),
            task(
                "query_dashboard_panel",
                vec![
                    req("dashboard_id", String),
                    req("panel_id", String),
                    req("datasource_uid", String),
                    req("queries", StringList),
                ],
            ),
            task(
                "execute_all_dashboard_panels",
                vec![
                    req("dashboard_uid", String),
                    opt("interval", Integer),
                    opt("panel_ids", StringList),
                    opt("template_variables", Object),
                ],
            ),
            task("fetch_dashboard_variables", vec![req("dashboard_uid", String)]),
            task("get_dashboard_config", vec![req("dashboard_uid", String)]),
            task("fetch_all_dashboards", vec![opt("limit", Integer).with_default(100)]),
            task("fetch_datasources", vec![]),
            task("fetch_folders", vec![]),
        ],
        SourceKind::Signoz => vec![
            task(
                "clickhouse_query",
                vec![
                    req("query", String),
                    opt("step", Integer),
                    opt("fill_gaps", Boolean).with_default(false),
                    opt("panel_type", String).with_default("table"),
                ],
            ),
            task(
                "builder_query",
                vec![
                    req("builder_queries", Object),
                    opt("step", Integer),
                    opt("panel_type", String).with_default("table"),
                ],
            ),
            task(
                "dashboard_data",
                vec![req("dashboard_name", String), opt("step", Integer), opt("variables", Object)],
            ),
            task("fetch_services", vec![]),
            task("fetch_dashboards", vec![]),
            task("fetch_dashboard_details", vec![req("dashboard_id", String)]),
            task(
                "fetch_apm_metrics",
                vec![
                    req("service_name", String),
                    opt("window", String).with_default("5m"),
                    opt("operation_names", StringList),
                    opt("metrics", StringList),
                ],
            ),
            task(
                "fetch_traces_or_logs",
                vec![
                    req("data_type", String),
                    opt("service_name", String),
                    opt("limit", Integer).with_default(100),
                ],
            ),
            task("fetch_alerts", vec![]),
            task("fetch_alert_details", vec![req("alert_id", String)]),
        ],
        SourceKind::Bash => vec![task(
            "command",
            vec![req("command", String).verbatim(), opt("remote_server", String)],
        )],
        SourceKind::Kubernetes => vec![
            task("command", vec![req("command", String).verbatim()]),
            task("k8s_write_command", vec![req("command", String).verbatim()]),
        ],
        SourceKind::Cloudwatch => vec![
            task(
                "metric_execution",
                vec![
                    req("namespace", String),
                    req("metric_name", String),
                    req("region", String),
                    opt("dimensions", ObjectList),
                    opt("statistic", String).with_default("Average"),
                    opt("period", Integer),
                    opt("timeseries_offsets", ParamType::Any),
                ],
            ),
            task(
                "filter_log_events",
                vec![req("log_group_name", String), req("region", String), opt("filter_query", String)],
            ),
            task("ecs_list_clusters", vec![]),
            task("ecs_list_tasks", vec![req("cluster_name", String)]),
            task(
                "ecs_get_task_logs",
                vec![
                    req("cluster_name", String),
                    opt("task_definition", String),
                    opt("max_lines", Integer),
                ],
            ),
            task("fetch_dashboard", vec![req("dashboard_name", String), opt("step", Integer)]),
            task("fetch_s3_file", vec![req("bucket_name", String), req("object_key", String)]),
            task("rds_get_sql_query_performance_stats", vec![req("db_resource_uri", String)]),
        ],
        SourceKind::Sentry => vec![
            task("fetch_issue_info_by_id", vec![req("issue_id", String)]),
            task(
                "fetch_event_info_by_id",
                vec![req("event_id", String), req("project_slug", String)],
            ),
            task(
                "fetch_list_of_recent_events_with_search_query",
                vec![
                    req("project_slug", String),
                    opt("query", String).with_default("is:unresolved"),
                    opt("max_events_to_analyse", Integer).with_default(10),
                ],
            ),
        ],
        SourceKind::Datadog => vec![
            task(
                "service_metric_execution",
                vec![
                    req("service_name", String),
                    req("environment_name", String),
                    req("metric_family", String),
                    req("metrics", StringList),
                    opt("interval", Integer),
                ],
            ),
            task("log_query_execution", vec![req("query", String)]),
            task(
                "dashboard_multiple_widgets",
                vec![req("dashboard_name", String), opt("widget_id", String)],
            ),
            task("apm_queries", vec![]),
        ],
        SourceKind::Newrelic => vec![
            task(
                "entity_application_golden_metric_execution",
                vec![
                    req("application_entity_name", String),
                    req("golden_metric_name", String),
                    req("golden_metric_unit", String),
                    req("golden_metric_nrql_expression", String),
                ],
            ),
            task(
                "entity_application_apm_metric_execution",
                vec![req("application_entity_name", String), opt("apm_metric_names", String)],
            ),
            task(
                "entity_dashboard_widget_nrql_metric_execution",
                vec![req("dashboard_guid", String), req("widget_id", String)],
            ),
            task("nrql_metric_execution", vec![req("nrql_expression", String)]),
            task(
                "fetch_dashboard_widgets",
                vec![
                    req("dashboard_name", String),
                    opt("page_name", String),
                    opt("widget_names", StringList),
                ],
            ),
        ],
        SourceKind::Postgres | SourceKind::Clickhouse => vec![sql_query(true)],
        SourceKind::SqlDatabaseConnection => vec![sql_query(false)],
        SourceKind::Posthog => vec![
            task("hogql_query", vec![req("query", String)]),
            task(
                "event_query",
                vec![
                    opt("event_name", String),
                    opt("person_id", String),
                    opt("properties", Object),
                    opt("limit", Integer),
                ],
            ),
        ],
    }
}
