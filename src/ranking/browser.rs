use super::{
  criteria::FilterCriteria,
  pipeline::{paginate, rank, total_pages, RankedExperience, RankedPage, PAGE_SIZE},
};
use crate::{domains::experience::model::Experience, utils::geo::Coordinate};

/// 一覧表示の状態。元データ・条件・基準地点のいずれかが変わるとページを 1 に戻す
#[derive(Debug, Clone)]
pub struct ExperienceBrowser {
  source: Vec<Experience>,
  criteria: FilterCriteria,
  reference: Option<Coordinate>,
  page: usize,
  page_size: usize,
  ranked: Vec<RankedExperience>,
}

impl Default for ExperienceBrowser {
  fn default() -> Self {
    Self::new(PAGE_SIZE)
  }
}

impl ExperienceBrowser {
  pub fn new(page_size: usize) -> Self {
    Self {
      source: Vec::new(),
      criteria: FilterCriteria::default(),
      reference: None,
      page: 1,
      page_size: page_size.max(1),
      ranked: Vec::new(),
    }
  }

  /// 元データ・条件・基準地点をまとめて与え、一度だけ並べ替える
  pub fn with_inputs(source: Vec<Experience>, criteria: FilterCriteria, reference: Option<Coordinate>) -> Self {
    let mut browser = Self::default();
    browser.source = source;
    browser.criteria = criteria;
    browser.reference = reference;
    browser.refresh();
    browser
  }

  pub fn set_source(&mut self, source: Vec<Experience>) {
    self.source = source;
    self.refresh();
  }

  pub fn set_criteria(&mut self, criteria: FilterCriteria) {
    self.criteria = criteria;
    self.refresh();
  }

  pub fn set_reference_point(&mut self, reference: Option<Coordinate>) {
    self.reference = reference;
    self.refresh();
  }

  /// 指定ページへ移動する。範囲外は丸めた結果のページ番号を返す
  pub fn go_to_page(&mut self, page: usize) -> usize {
    self.page = page.clamp(1, self.total_pages().max(1));
    self.page
  }

  pub fn page(&self) -> usize {
    self.page
  }

  pub fn total_pages(&self) -> usize {
    total_pages(self.ranked.len(), self.page_size)
  }

  pub fn ranked(&self) -> &[RankedExperience] {
    &self.ranked
  }

  pub fn current(&self) -> RankedPage {
    paginate(self.ranked.clone(), self.page, self.page_size)
  }

  fn refresh(&mut self) {
    self.ranked = rank(&self.source, &self.criteria, self.reference);
    self.page = 1;
  }
}
