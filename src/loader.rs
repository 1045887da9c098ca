// src/loader.rs
//! ルートごとのコンポーネント読み込みスロット。
//!
//! 同じルートに対する同時読み込みは 1 つの共有 Future に合流させ、
//! ファクトリは読み込み中 1 回しか起動しない。keepAlive のルートは
//! 成功したビューを保持し続ける。失敗は保持しない (次の呼び出しで再試行される)。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tracing::debug;

use crate::component::{ComponentRef, LoadError, View};

pub type LoadOutcome = Result<Arc<View>, Arc<LoadError>>;

type SharedLoad = Shared<BoxFuture<'static, LoadOutcome>>;

enum Slot {
    Idle,
    Loading { generation: u64, future: SharedLoad },
    Ready(Arc<View>),
}

/// ルート ID (= インデックス) で引く読み込みスロットの列
pub(crate) struct LoadSlots {
    slots: Vec<Mutex<Slot>>,
    generation: AtomicU64,
}

impl LoadSlots {
    pub(crate) fn new() -> Self {
        LoadSlots {
            slots: Vec::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// 新しく登録されたルートの分だけスロットを増やす
    pub(crate) fn grow_to(&mut self, len: usize) {
        while self.slots.len() < len {
            self.slots.push(Mutex::new(Slot::Idle));
        }
    }

    pub(crate) async fn load(
        &self,
        index: usize,
        component: &ComponentRef,
        keep_alive: bool,
    ) -> LoadOutcome {
        let slot = &self.slots[index];

        // 1) スロットを確認し、必要ならファクトリを起動する
        let (generation, future) = {
            let mut state = slot.lock();
            match &*state {
                Slot::Ready(view) => return Ok(Arc::clone(view)),
                Slot::Loading { generation, future } => {
                    debug!(
                        route = index,
                        specifier = component.specifier(),
                        "joining in-flight load"
                    );
                    (*generation, future.clone())
                }
                Slot::Idle => {
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        route = index,
                        specifier = component.specifier(),
                        "invoking component factory"
                    );
                    let future = component
                        .invoke()
                        .map(|result| result.map(Arc::new).map_err(Arc::new))
                        .boxed()
                        .shared();
                    *state = Slot::Loading {
                        generation,
                        future: future.clone(),
                    };
                    (generation, future)
                }
            }
        };

        // 2) 読み込み完了を待つ
        let outcome = future.await;

        // 3) 自分が待っていた読み込みがまだスロットにあれば後始末する
        let mut state = slot.lock();
        if matches!(&*state, Slot::Loading { generation: g, .. } if *g == generation) {
            *state = match &outcome {
                Ok(view) if keep_alive => Slot::Ready(Arc::clone(view)),
                _ => Slot::Idle,
            };
        }
        outcome
    }
}
