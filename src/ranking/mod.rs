//! 体験一覧・ルート作成・地図ポップアップで共通に使う
//! 距離計算、絞り込み、並び替え、ページ分割の処理。
//!
//! I/O を行わないため失敗しない。入力が空、または条件で全件除外された場合は空の結果を返す。

mod browser;
mod criteria;
mod pipeline;

pub use browser::ExperienceBrowser;
pub use criteria::{FilterCriteria, SortKey, SortOrder, UNLIMITED_DISTANCE_KM};
pub use pipeline::{paginate, rank, sort_by_distance, sort_ranked, total_pages, RankedExperience, RankedPage, PAGE_SIZE};
