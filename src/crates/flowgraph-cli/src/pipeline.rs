//! Complex RAG demo pipeline
//!
//! Eight placeholder steps standing in for a retrieval-augmented answering
//! flow. Every step returns fixed data; the point is the shape of the graph
//! and the way state moves through it.
//!
//! ```text
//! input → memory_rewrite → question_generation → document_retrieval
//!       → duplicate_removal → answer_generation → output ─┬─► ask_for_feedback → END
//!                                                         └─► END
//! ```
//!
//! `output` routes to `ask_for_feedback` only for [`FEEDBACK_USER`].

use flowgraph_core::yaml::{EdgeDefinition, GraphDefinition, HandlerRegistry, NodeDefinition};
use flowgraph_core::{
    Append, ClosedLabel, CompiledGraph, GraphState, Message, NodeResult, Patch, Reducer, Result,
    StateGraph, Target, END,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// User that is asked for feedback after the answer
pub const FEEDBACK_USER: &str = "user_456";

/// Name of the routing condition in definition files
pub const FEEDBACK_CONDITION: &str = "should_ask_for_feedback";

/// Node names, in execution order
pub const NODES: [&str; 8] = [
    "input",
    "memory_rewrite",
    "question_generation",
    "document_retrieval",
    "duplicate_removal",
    "answer_generation",
    "output",
    "ask_for_feedback",
];

/// State shared by the pipeline steps
///
/// `session_id` and `user_id` come from the caller and no step can change them:
/// [`RagUpdate`] has no field for either.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagState {
    pub session_id: String,
    pub user_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewritten_question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_questions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_documents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_documents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl RagState {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            ..Default::default()
        }
    }
}

/// Delta returned by a pipeline step
#[derive(Debug, Default)]
pub struct RagUpdate {
    pub messages: Vec<Message>,
    pub rewritten_question: Patch<String>,
    pub generated_questions: Patch<Vec<String>>,
    pub retrieved_documents: Patch<Vec<String>>,
    pub unique_documents: Patch<Vec<String>>,
    pub answer: Patch<String>,
    pub feedback: Patch<String>,
}

impl GraphState for RagState {
    type Update = RagUpdate;

    fn merge(&mut self, update: RagUpdate) {
        Append::reduce(&mut self.messages, update.messages);
        update.rewritten_question.apply_to(&mut self.rewritten_question);
        update.generated_questions.apply_to(&mut self.generated_questions);
        update.retrieved_documents.apply_to(&mut self.retrieved_documents);
        update.unique_documents.apply_to(&mut self.unique_documents);
        update.answer.apply_to(&mut self.answer);
        update.feedback.apply_to(&mut self.feedback);
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.session_id.is_empty() {
            return Err("session_id must not be empty".to_string());
        }
        if self.user_id.is_empty() {
            return Err("user_id must not be empty".to_string());
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn input(_: &RagState) -> NodeResult<RagUpdate> {
    Ok(RagUpdate {
        messages: vec![Message::user("What is the weather today?")],
        ..Default::default()
    })
}

pub fn memory_rewrite(_: &RagState) -> NodeResult<RagUpdate> {
    Ok(RagUpdate {
        rewritten_question: Patch::Set("What's today's weather forecast?".to_string()),
        ..Default::default()
    })
}

pub fn question_generation(_: &RagState) -> NodeResult<RagUpdate> {
    Ok(RagUpdate {
        generated_questions: Patch::Set(strings(&[
            "What is the weather like today?",
            "Can you tell me today's weather?",
            "How is the weather today?",
        ])),
        ..Default::default()
    })
}

pub fn document_retrieval(_: &RagState) -> NodeResult<RagUpdate> {
    Ok(RagUpdate {
        retrieved_documents: Patch::Set(strings(&["Document 1", "Document 2", "Document 3"])),
        ..Default::default()
    })
}

pub fn duplicate_removal(_: &RagState) -> NodeResult<RagUpdate> {
    Ok(RagUpdate {
        unique_documents: Patch::Set(strings(&["Document 1", "Document 2"])),
        ..Default::default()
    })
}

/// Sets the answer and drops the deduplicated documents it no longer needs
pub fn answer_generation(_: &RagState) -> NodeResult<RagUpdate> {
    Ok(RagUpdate {
        answer: Patch::Set("The weather today is sunny with a chance of rain.".to_string()),
        unique_documents: Patch::Delete,
        ..Default::default()
    })
}

/// Appends the answer to the conversation
pub fn output(state: &RagState) -> NodeResult<RagUpdate> {
    let answer = state
        .answer
        .as_ref()
        .ok_or("output requires an answer")?;
    Ok(RagUpdate {
        messages: vec![Message::assistant(answer.clone())],
        ..Default::default()
    })
}

pub fn ask_for_feedback(_: &RagState) -> NodeResult<RagUpdate> {
    Ok(RagUpdate {
        feedback: Patch::Set("Thank you for your feedback!".to_string()),
        ..Default::default()
    })
}

/// Branches out of `output`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackRoute {
    AskForFeedback,
    Finish,
}

impl ClosedLabel for FeedbackRoute {
    fn variants() -> &'static [Self] {
        &[FeedbackRoute::AskForFeedback, FeedbackRoute::Finish]
    }
}

pub fn should_ask_for_feedback(state: &RagState) -> FeedbackRoute {
    if state.user_id == FEEDBACK_USER {
        FeedbackRoute::AskForFeedback
    } else {
        FeedbackRoute::Finish
    }
}

/// The pipeline, assembled in Rust
pub fn build_graph() -> Result<StateGraph<RagState>> {
    let mut graph = StateGraph::new();
    graph
        .add_node("input", input)?
        .add_node("memory_rewrite", memory_rewrite)?
        .add_node("question_generation", question_generation)?
        .add_node("document_retrieval", document_retrieval)?
        .add_node("duplicate_removal", duplicate_removal)?
        .add_node("answer_generation", answer_generation)?
        .add_node("output", output)?
        .add_node("ask_for_feedback", ask_for_feedback)?;

    graph.set_entry_point("input")?;
    for pair in NODES[..7].windows(2) {
        graph.add_edge(pair[0], pair[1])?;
    }
    graph.add_exhaustive_conditional_edges(
        "output",
        should_ask_for_feedback,
        HashMap::from([
            (FeedbackRoute::AskForFeedback, Target::from("ask_for_feedback")),
            (FeedbackRoute::Finish, Target::End),
        ]),
    )?;
    graph.set_finish_point("ask_for_feedback")?;
    Ok(graph)
}

/// Compiled pipeline with default options
pub fn app() -> Result<CompiledGraph<RagState>> {
    build_graph()?.compile()
}

/// Step functions and the routing condition, by name, for definition files
pub fn handlers() -> HandlerRegistry<RagState> {
    let mut registry = HandlerRegistry::new();
    registry
        .register_fn("input", input)
        .register_fn("memory_rewrite", memory_rewrite)
        .register_fn("question_generation", question_generation)
        .register_fn("document_retrieval", document_retrieval)
        .register_fn("duplicate_removal", duplicate_removal)
        .register_fn("answer_generation", answer_generation)
        .register_fn("output", output)
        .register_fn("ask_for_feedback", ask_for_feedback)
        .register_condition(FEEDBACK_CONDITION, |state: &RagState| {
            match should_ask_for_feedback(state) {
                FeedbackRoute::AskForFeedback => "ask_for_feedback".to_string(),
                FeedbackRoute::Finish => END.to_string(),
            }
        });
    registry
}

/// The pipeline topology as a definition document
pub fn definition() -> GraphDefinition {
    let nodes = NODES
        .iter()
        .map(|name| {
            let node = NodeDefinition {
                handler: name.to_string(),
                description: None,
            };
            (name.to_string(), node)
        })
        .collect();

    let mut edges: Vec<EdgeDefinition> = NODES[..7]
        .windows(2)
        .map(|pair| EdgeDefinition::Direct {
            from: pair[0].to_string(),
            to: Target::from(pair[1]),
        })
        .collect();
    edges.push(EdgeDefinition::Conditional {
        from: "output".to_string(),
        condition: FEEDBACK_CONDITION.to_string(),
        branches: BTreeMap::from([
            ("ask_for_feedback".to_string(), Target::from("ask_for_feedback")),
            (END.to_string(), Target::End),
        ]),
    });
    edges.push(EdgeDefinition::Direct {
        from: "ask_for_feedback".to_string(),
        to: Target::End,
    });

    GraphDefinition {
        name: "complex_rag".to_string(),
        description: Some("Retrieval-augmented answering with optional feedback".to_string()),
        entry: "input".to_string(),
        nodes,
        edges,
        terminal: Vec::new(),
    }
}
