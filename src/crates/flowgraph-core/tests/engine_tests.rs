//! Integration tests for graph construction and execution
//!
//! These tests drive the public API end to end with a small conversational
//! state: replace-on-write fields, an appended message history, and routing on
//! the merged state.

use flowgraph_core::{
    Append, BoxError, CancelHandle, CompileError, GraphError, GraphState, Message, MessageRole, Patch,
    Reducer, RunConfig, StateGraph, Target, END,
};
use futures::StreamExt;
use proptest::prelude::*;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Clone, Debug, Default)]
struct Session {
    user_id: String,
    messages: Vec<Message>,
    question: Option<String>,
    documents: Option<Vec<String>>,
    visited: Vec<String>,
}

#[derive(Default)]
struct SessionUpdate {
    messages: Vec<Message>,
    question: Patch<String>,
    documents: Patch<Vec<String>>,
    visited: Vec<String>,
}

impl SessionUpdate {
    fn visit(node: &str) -> Self {
        Self {
            visited: vec![node.to_string()],
            ..Default::default()
        }
    }
}

impl GraphState for Session {
    type Update = SessionUpdate;

    fn merge(&mut self, update: SessionUpdate) {
        Append::reduce(&mut self.messages, update.messages);
        update.question.apply_to(&mut self.question);
        update.documents.apply_to(&mut self.documents);
        Append::reduce(&mut self.visited, update.visited);
    }

    fn validate(&self) -> Result<(), String> {
        if self.user_id.is_empty() {
            return Err("user_id is required".to_string());
        }
        Ok(())
    }
}

fn session(user_id: &str) -> Session {
    Session {
        user_id: user_id.to_string(),
        ..Default::default()
    }
}

fn routing_graph() -> StateGraph<Session> {
    let mut graph = StateGraph::new();
    for name in ["a", "b", "c", "d"] {
        graph
            .add_node(name, move |_: &Session| Ok(SessionUpdate::visit(name)))
            .unwrap();
    }
    graph
        .add_edge("__start__", "a")
        .unwrap()
        .add_edge("a", "b")
        .unwrap()
        .add_edge("b", "c")
        .unwrap()
        .add_conditional_edges(
            "c",
            |s: &Session| if s.user_id == "X" { "d" } else { END },
            HashMap::from([("d", Target::from("d")), (END, Target::End)]),
        )
        .unwrap()
        .set_finish_point("d")
        .unwrap();
    graph
}

#[tokio::test]
async fn test_routes_to_d_for_matching_user() {
    let app = routing_graph().compile().unwrap();

    let matched = app.invoke(session("X")).await.unwrap();
    assert_eq!(matched.visited, vec!["a", "b", "c", "d"]);

    let other = app.invoke(session("Y")).await.unwrap();
    assert_eq!(other.visited, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_messages_append_in_order() {
    let mut graph = StateGraph::new();
    graph
        .add_node("ask", |_: &Session| {
            Ok(SessionUpdate {
                messages: vec![Message::user("first")],
                ..Default::default()
            })
        })
        .unwrap()
        .add_node("answer", |_: &Session| {
            Ok(SessionUpdate {
                messages: vec![Message::assistant("second")],
                ..Default::default()
            })
        })
        .unwrap()
        .set_entry_point("ask")
        .unwrap()
        .add_edge("ask", "answer")
        .unwrap()
        .set_finish_point("answer")
        .unwrap();

    let state = graph.compile().unwrap().invoke(session("u")).await.unwrap();
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[0], Message::user("first"));
    assert_eq!(state.messages[1].role, MessageRole::Assistant);
}

#[tokio::test]
async fn test_replace_and_delete_visible_to_next_node() {
    let mut graph = StateGraph::new();
    graph
        .add_node("retrieve", |_: &Session| {
            Ok(SessionUpdate {
                question: Patch::Set("draft".to_string()),
                documents: Patch::Set(vec!["Document 1".to_string()]),
                ..Default::default()
            })
        })
        .unwrap()
        .add_node("rewrite", |s: &Session| {
            assert_eq!(s.question.as_deref(), Some("draft"));
            Ok(SessionUpdate {
                question: Patch::Set("final".to_string()),
                documents: Patch::Delete,
                ..Default::default()
            })
        })
        .unwrap()
        .add_node("check", |s: &Session| {
            assert_eq!(s.question.as_deref(), Some("final"));
            assert!(s.documents.is_none());
            Ok(SessionUpdate::visit("check"))
        })
        .unwrap()
        .set_entry_point("retrieve")
        .unwrap()
        .add_edge("retrieve", "rewrite")
        .unwrap()
        .add_edge("rewrite", "check")
        .unwrap()
        .set_finish_point("check")
        .unwrap();

    let state = graph.compile().unwrap().invoke(session("u")).await.unwrap();
    assert_eq!(state.question.as_deref(), Some("final"));
    assert!(state.documents.is_none());
    assert_eq!(state.visited, vec!["check"]);
}

#[test]
fn test_unreachable_dangling_target_fails_compile() {
    let mut graph = StateGraph::new();
    graph
        .add_node("a", |_: &Session| Ok(SessionUpdate::visit("a")))
        .unwrap()
        .add_node("orphan", |_: &Session| Ok(SessionUpdate::visit("orphan")))
        .unwrap()
        .set_entry_point("a")
        .unwrap()
        .set_finish_point("a")
        .unwrap()
        .add_edge("orphan", "ghost")
        .unwrap();

    match graph.compile() {
        Err(GraphError::Compile(CompileError::DanglingTarget { from, to })) => {
            assert_eq!(from, "orphan");
            assert_eq!(to, "ghost");
        }
        other => panic!("expected dangling target, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn test_unmapped_label_fails_run() {
    let mut graph = StateGraph::new();
    graph
        .add_node("a", |_: &Session| Ok(SessionUpdate::visit("a")))
        .unwrap()
        .set_entry_point("a")
        .unwrap()
        .add_conditional_edges(
            "a",
            |_: &Session| "maybe".to_string(),
            HashMap::from([("yes".to_string(), Target::End)]),
        )
        .unwrap();

    let failure = graph
        .compile()
        .unwrap()
        .invoke_with_config(session("u"), &RunConfig::default())
        .await
        .unwrap_err();
    match failure.error {
        GraphError::UnmappedLabel { node, label } => {
            assert_eq!(node, "a");
            assert!(label.contains("maybe"));
        }
        other => panic!("expected unmapped label, got {other}"),
    }
    assert_eq!(failure.state.visited, vec!["a"]);
}

#[tokio::test]
async fn test_step_error_keeps_partial_state() {
    let mut graph = StateGraph::new();
    graph
        .add_node("ok", |_: &Session| Ok(SessionUpdate::visit("ok")))
        .unwrap()
        .add_node("boom", |_: &Session| Err("retriever unavailable".into()))
        .unwrap()
        .set_entry_point("ok")
        .unwrap()
        .add_edge("ok", "boom")
        .unwrap()
        .set_finish_point("boom")
        .unwrap();

    let failure = graph
        .compile()
        .unwrap()
        .invoke_with_config(session("u"), &RunConfig::default())
        .await
        .unwrap_err();
    assert_eq!(failure.error.node(), Some("boom"));
    assert!(failure.error.to_string().contains("retriever unavailable"));
    assert_eq!(failure.state.visited, vec!["ok"]);
    assert_eq!(failure.steps, 1);
}

#[tokio::test]
async fn test_missing_identity_rejected() {
    let app = routing_graph().compile().unwrap();
    let err = app.invoke(Session::default()).await.unwrap_err();
    assert!(matches!(err, GraphError::InvalidInput(_)));
}

#[tokio::test]
async fn test_dispatcher_error_keeps_merged_update() {
    let mut graph = StateGraph::new();
    graph
        .add_node("retrieve", |_: &Session| {
            Ok(SessionUpdate {
                documents: Patch::Set(vec!["doc".to_string()]),
                ..SessionUpdate::visit("retrieve")
            })
        })
        .unwrap()
        .add_node("answer", |_: &Session| Ok(SessionUpdate::visit("answer")))
        .unwrap()
        .set_entry_point("retrieve")
        .unwrap()
        .add_fallible_conditional_edges(
            "retrieve",
            |s: &Session| {
                s.question
                    .as_ref()
                    .map(|_| "answer")
                    .ok_or_else(|| BoxError::from("question missing"))
            },
            HashMap::from([("answer", Target::from("answer"))]),
        )
        .unwrap()
        .set_finish_point("answer")
        .unwrap();
    let app = graph.compile().unwrap();

    let handle = tokio::spawn({
        let app = app.clone();
        async move {
            app.invoke_with_config(session("u"), &RunConfig::default())
                .await
        }
    });
    let failure = handle.await.expect("run must not panic").unwrap_err();
    assert_eq!(failure.error.node(), Some("retrieve"));
    assert!(matches!(failure.error, GraphError::StepExecution { .. }));
    assert_eq!(failure.state.documents, Some(vec!["doc".to_string()]));
    assert_eq!(failure.state.visited, vec!["retrieve"]);

    let mut asked = session("u");
    asked.question = Some("why?".to_string());
    let finished = app.invoke(asked).await.unwrap();
    assert_eq!(finished.visited, vec!["retrieve", "answer"]);
}

#[tokio::test]
async fn test_cycle_stopped_by_recursion_limit() {
    let mut graph = StateGraph::new();
    graph
        .add_node("spin", |_: &Session| Ok(SessionUpdate::visit("spin")))
        .unwrap()
        .set_entry_point("spin")
        .unwrap()
        .add_edge("spin", "spin")
        .unwrap();

    let failure = graph
        .compile()
        .unwrap()
        .invoke_with_config(session("u"), &RunConfig::new().with_recursion_limit(5))
        .await
        .unwrap_err();
    assert!(matches!(failure.error, GraphError::RecursionLimit { limit: 5, ref node } if node == "spin"));
    assert_eq!(failure.state.visited.len(), 5);
}

#[tokio::test]
async fn test_cancel_between_nodes() {
    let handle = CancelHandle::new();
    let trigger = handle.clone();

    let mut graph = StateGraph::new();
    graph
        .add_node("first", move |_: &Session| {
            trigger.cancel();
            Ok(SessionUpdate::visit("first"))
        })
        .unwrap()
        .add_node("second", |_: &Session| Ok(SessionUpdate::visit("second")))
        .unwrap()
        .set_entry_point("first")
        .unwrap()
        .add_edge("first", "second")
        .unwrap()
        .set_finish_point("second")
        .unwrap();

    let failure = graph
        .compile()
        .unwrap()
        .invoke_with_config(session("u"), &RunConfig::new().with_cancel_handle(handle))
        .await
        .unwrap_err();
    assert!(matches!(
        failure.error,
        GraphError::Cancelled { after: Some(ref n) } if n == "first"
    ));
    assert_eq!(failure.state.visited, vec!["first"]);
}

#[tokio::test]
async fn test_async_nodes_and_stream() {
    let mut graph = StateGraph::new();
    graph
        .add_async_node("fetch", |_: &Session| async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok::<_, BoxError>(SessionUpdate::visit("fetch"))
        })
        .unwrap()
        .add_node("reply", |_: &Session| Ok(SessionUpdate::visit("reply")))
        .unwrap()
        .set_entry_point("fetch")
        .unwrap()
        .add_edge("fetch", "reply")
        .unwrap()
        .set_finish_point("reply")
        .unwrap();

    let app = graph.compile().unwrap();
    let nodes: Vec<String> = app
        .stream(session("u"))
        .map(|event| event.unwrap().node)
        .collect()
        .await;
    assert_eq!(nodes, vec!["fetch", "reply"]);
}

#[tokio::test]
async fn test_concurrent_invocations_do_not_interfere() {
    let app = routing_graph().compile().unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let app = app.clone();
        let user = if i % 2 == 0 { "X" } else { "Y" };
        handles.push(tokio::spawn(async move { app.invoke(session(user)).await }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let state = handle.await.unwrap().unwrap();
        let expected = if i % 2 == 0 { 4 } else { 3 };
        assert_eq!(state.visited.len(), expected);
        assert!(state.messages.is_empty());
    }
}

proptest! {
    #[test]
    fn prop_append_is_associative(
        a in prop::collection::vec(any::<u8>(), 0..8),
        b in prop::collection::vec(any::<u8>(), 0..8),
        c in prop::collection::vec(any::<u8>(), 0..8),
    ) {
        let mut stepwise = Vec::new();
        Append::reduce(&mut stepwise, a.clone());
        Append::reduce(&mut stepwise, b.clone());
        Append::reduce(&mut stepwise, c.clone());

        let mut grouped = a.clone();
        let mut tail = b.clone();
        Append::reduce(&mut tail, c.clone());
        Append::reduce(&mut grouped, tail);

        prop_assert_eq!(&stepwise, &grouped);
        prop_assert_eq!(stepwise.len(), a.len() + b.len() + c.len());
        prop_assert_eq!(&stepwise[..a.len()], &a[..]);
    }

    #[test]
    fn prop_last_write_wins(values in prop::collection::vec("[a-z]{1,6}", 1..6)) {
        let mut slot = None;
        for value in &values {
            Patch::Set(value.clone()).apply_to(&mut slot);
            Patch::<String>::Keep.apply_to(&mut slot);
        }
        prop_assert_eq!(slot.as_ref(), values.last());
    }
}
