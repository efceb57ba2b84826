use std::borrow::Borrow;
use std::collections::HashSet;

use crate::model::Task;

/// Waves computed by [`resolve`], as indices into the input slice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub waves: Vec<Vec<usize>>,

    /// Tasks that never became eligible: cycles, self-references, and
    /// anything waiting behind them. Kept in input order.
    pub unresolved: Vec<usize>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Single-predecessor leveling
///
/// Each pass scans the unprocessed tasks in input order; a task is eligible
/// when its predecessor is empty, unknown, or finished in an earlier wave.
/// Stops when everything is placed or a pass places nothing.
///
/// # Time Complexity
///
/// O(n²) passes-by-tasks, never loops on cyclic input
pub fn resolve<T: Borrow<Task>>(tasks: &[T]) -> Resolution {
    let known: HashSet<&str> = tasks.iter().map(|t| as_task(t).id.as_str()).collect();
    let mut processed: HashSet<&str> = HashSet::new();
    let mut placed = vec![false; tasks.len()];
    let mut waves = Vec::new();

    loop {
        let wave: Vec<usize> = tasks
            .iter()
            .enumerate()
            .filter(|(i, _)| !placed[*i])
            .filter(|(_, t)| {
                let pred = as_task(*t).predecessor.trim();
                // Dangling predecessors count as satisfied.
                pred.is_empty() || !known.contains(pred) || processed.contains(pred)
            })
            .map(|(i, _)| i)
            .collect();

        if wave.is_empty() {
            break;
        }
        for &i in &wave {
            placed[i] = true;
            processed.insert(as_task(&tasks[i]).id.as_str());
        }
        waves.push(wave);
    }

    let unresolved = (0..tasks.len()).filter(|i| !placed[*i]).collect();
    Resolution { waves, unresolved }
}

fn as_task<T: Borrow<Task>>(t: &T) -> &Task {
    <T as Borrow<Task>>::borrow(t)
}

/// Group tasks into waves. Tasks that cannot be placed are dropped from the
/// output; use [`resolve`] to see them.
pub fn group(tasks: &[Task]) -> Vec<Vec<Task>> {
    resolve(tasks)
        .waves
        .into_iter()
        .map(|wave| wave.into_iter().map(|i| tasks[i].clone()).collect())
        .collect()
}
