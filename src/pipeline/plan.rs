//! Validation plans and their dependency graph

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet, VecDeque};
use uuid::Uuid;

use super::error::PlanningError;
use super::step::Step;

/// An ordered, validated set of steps for one article.
///
/// Construction checks that step ids are unique, that every dependency names a
/// step of the same plan and that the dependency graph is acyclic. Deserialized
/// plans go through the same checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPlan")]
pub struct Plan {
    id: Uuid,
    article_id: Uuid,
    steps: Vec<Step>,
    context: BTreeMap<String, Value>,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawPlan {
    id: Uuid,
    article_id: Uuid,
    steps: Vec<Step>,
    #[serde(default)]
    context: BTreeMap<String, Value>,
    created_at: DateTime<Utc>,
}

impl TryFrom<RawPlan> for Plan {
    type Error = PlanningError;

    fn try_from(raw: RawPlan) -> Result<Self, Self::Error> {
        StepGraph::build(&raw.steps)?;
        Ok(Self {
            id: raw.id,
            article_id: raw.article_id,
            steps: raw.steps,
            context: raw.context,
            created_at: raw.created_at,
        })
    }
}

impl Plan {
    pub fn new(article_id: Uuid, steps: Vec<Step>) -> Result<Self, PlanningError> {
        StepGraph::build(&steps)?;
        Ok(Self {
            id: Uuid::new_v4(),
            article_id,
            steps,
            context: BTreeMap::new(),
            created_at: Utc::now(),
        })
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn article_id(&self) -> Uuid {
        self.article_id
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn context(&self) -> &BTreeMap<String, Value> {
        &self.context
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub(crate) fn graph(&self) -> StepGraph {
        // Validated on construction
        StepGraph::build(&self.steps).unwrap_or_default()
    }

    /// Sequential execution order: topological, ties broken by priority then position
    pub fn execution_order(&self) -> Vec<&Step> {
        let graph = self.graph();
        let mut in_degree = graph.in_degree.clone();
        let mut ready: BinaryHeap<Reverse<(u32, usize)>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| Reverse((self.steps[i].priority, i)))
            .collect();

        let mut order = Vec::with_capacity(self.steps.len());
        while let Some(Reverse((_, idx))) = ready.pop() {
            order.push(&self.steps[idx]);
            for &dependent in &graph.dependents[idx] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push(Reverse((self.steps[dependent].priority, dependent)));
                }
            }
        }
        order
    }
}

/// Arena view of a plan's dependency graph, indexed by step position
#[derive(Debug, Clone, Default)]
pub(crate) struct StepGraph {
    pub dependents: Vec<Vec<usize>>,
    pub prerequisites: Vec<Vec<usize>>,
    pub in_degree: Vec<usize>,
}

impl StepGraph {
    pub fn build(steps: &[Step]) -> Result<Self, PlanningError> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            if index.insert(step.id.as_str(), i).is_some() {
                return Err(PlanningError::DuplicateStep(step.id.clone()));
            }
        }

        let mut dependents = vec![Vec::new(); steps.len()];
        let mut prerequisites = vec![Vec::new(); steps.len()];
        let mut in_degree = vec![0usize; steps.len()];
        for (i, step) in steps.iter().enumerate() {
            for dep in &step.dependencies {
                let &d = index
                    .get(dep.as_str())
                    .ok_or_else(|| PlanningError::UnknownDependency {
                        step: step.id.clone(),
                        dependency: dep.clone(),
                    })?;
                dependents[d].push(i);
                prerequisites[i].push(d);
                in_degree[i] += 1;
            }
        }

        // Kahn's algorithm; anything left unvisited sits on a cycle
        let mut remaining = in_degree.clone();
        let mut queue: VecDeque<usize> = (0..steps.len()).filter(|&i| remaining[i] == 0).collect();
        let mut visited = HashSet::with_capacity(steps.len());
        while let Some(node) = queue.pop_front() {
            visited.insert(node);
            for &next in &dependents[node] {
                remaining[next] -= 1;
                if remaining[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if visited.len() < steps.len() {
            let cyclic = steps
                .iter()
                .enumerate()
                .filter(|(i, _)| !visited.contains(i))
                .map(|(_, s)| s.id.clone())
                .collect();
            return Err(PlanningError::CyclicDependency(cyclic));
        }

        Ok(Self {
            dependents,
            prerequisites,
            in_degree,
        })
    }

    /// All steps reachable from `root` through dependent edges, excluding `root`
    pub fn transitive_dependents(&self, root: usize) -> Vec<usize> {
        reachable(&self.dependents, root)
    }

    /// Every step `root` depends on, directly or through other steps
    pub fn transitive_prerequisites(&self, root: usize) -> Vec<usize> {
        reachable(&self.prerequisites, root)
    }
}

fn reachable(edges: &[Vec<usize>], root: usize) -> Vec<usize> {
    let mut seen = vec![false; edges.len()];
    let mut stack = edges[root].clone();
    let mut out = Vec::new();
    while let Some(node) = stack.pop() {
        if seen[node] {
            continue;
        }
        seen[node] = true;
        out.push(node);
        stack.extend(edges[node].iter().copied());
    }
    out.sort_unstable();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::step::{ConsistencyCheckParams, StepKind};

    fn step(id: &str) -> Step {
        Step::new(
            id,
            StepKind::ConsistencyCheck(ConsistencyCheckParams { threshold: 0.8 }),
        )
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let result = Plan::new(Uuid::new_v4(), vec![step("a"), step("a")]);
        assert_eq!(result, Err(PlanningError::DuplicateStep("a".to_string())));
    }

    #[test]
    fn test_rejects_unknown_dependency() {
        let result = Plan::new(Uuid::new_v4(), vec![step("a").depends_on("missing")]);
        assert!(matches!(
            result,
            Err(PlanningError::UnknownDependency { ref dependency, .. }) if dependency == "missing"
        ));
    }

    #[test]
    fn test_rejects_cycle() {
        let steps = vec![
            step("a").depends_on("c"),
            step("b").depends_on("a"),
            step("c").depends_on("b"),
            step("d"),
        ];
        match Plan::new(Uuid::new_v4(), steps) {
            Err(PlanningError::CyclicDependency(ids)) => {
                assert_eq!(ids, vec!["a", "b", "c"]);
            }
            other => panic!("Expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_self_dependency() {
        let result = Plan::new(Uuid::new_v4(), vec![step("a").depends_on("a")]);
        assert!(matches!(result, Err(PlanningError::CyclicDependency(_))));
    }

    #[test]
    fn test_execution_order_respects_dependencies_and_priority() {
        let steps = vec![
            step("last").with_priority(1).depends_on("late").depends_on("early"),
            step("late").with_priority(5).depends_on("root"),
            step("early").with_priority(2).depends_on("root"),
            step("root").with_priority(9),
        ];
        let plan = Plan::new(Uuid::new_v4(), steps).unwrap();
        let order: Vec<&str> = plan.execution_order().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, vec!["root", "early", "late", "last"]);
    }

    #[test]
    fn test_transitive_dependents() {
        let steps = vec![
            step("a"),
            step("b").depends_on("a"),
            step("c").depends_on("b"),
            step("d"),
        ];
        let plan = Plan::new(Uuid::new_v4(), steps).unwrap();
        assert_eq!(plan.graph().transitive_dependents(0), vec![1, 2]);
        assert!(plan.graph().transitive_dependents(3).is_empty());
    }

    #[test]
    fn test_transitive_prerequisites() {
        let steps = vec![
            step("a"),
            step("b").depends_on("a"),
            step("c").depends_on("b"),
            step("d"),
            step("e").depends_on("c").depends_on("a"),
        ];
        let plan = Plan::new(Uuid::new_v4(), steps).unwrap();
        let graph = plan.graph();
        assert_eq!(graph.transitive_prerequisites(2), vec![0, 1]);
        assert_eq!(graph.transitive_prerequisites(4), vec![0, 1, 2]);
        assert!(graph.transitive_prerequisites(0).is_empty());
        assert!(graph.transitive_prerequisites(3).is_empty());
    }

    #[test]
    fn test_deserialization_revalidates_graph() {
        let plan = Plan::new(Uuid::new_v4(), vec![step("a"), step("b").depends_on("a")]).unwrap();
        let mut json = serde_json::to_value(&plan).unwrap();
        json["steps"][0]["dependencies"] = serde_json::json!(["b"]);

        let err = serde_json::from_value::<Plan>(json).unwrap_err();
        assert!(err.to_string().contains("Cyclic dependency"));
    }
}
