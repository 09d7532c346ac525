//! Per-document stage orchestration and artifact caching
//!
//! Each stage writes one JSON artifact under `<out_dir>/<document_id>/`.
//! Reruns load existing artifacts instead of recomputing, which makes the
//! pipeline idempotent; `--overwrite` forces selected stages to rebuild.
//! A stage outside the selected set must already have its artifact on
//! disk, otherwise the run fails with a missing-artifact error.

use std::fs;
use std::path::{Path, PathBuf};

use papergraph_core::{
    DocumentGraph, DocumentInput, Entity, Mention, PipelineConfig, PipelineError, ReducerConfig,
    Relation, Result, RetainedSection, Sentence,
};
use papergraph_extract::{EntityEnsemble, EntityRegistry, RelationExtractor};
use papergraph_graph::{slugify, GraphAssembler, SubgraphReducer};
use papergraph_segment::{reconstruct_text, SectionFilter, SentenceSegmenter};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Sections,
    Sentences,
    Entities,
    Relations,
    Graph,
    Views,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Sections,
        Stage::Sentences,
        Stage::Entities,
        Stage::Relations,
        Stage::Graph,
        Stage::Views,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sections => "sections",
            Self::Sentences => "sentences",
            Self::Entities => "entities",
            Self::Relations => "relations",
            Self::Graph => "graph",
            Self::Views => "views",
        }
    }

    /// Primary artifact file for the stage. The views stage writes several
    /// files; the overview doubles as its cache marker.
    fn artifact(&self) -> &'static str {
        match self {
            Self::Sections => "sections.json",
            Self::Sentences => "sentences.json",
            Self::Entities => "entities.json",
            Self::Relations => "relations.json",
            Self::Graph => "graph_core.json",
            Self::Views => "graph_overview.json",
        }
    }
}

/// Parse a comma-separated stage list.
pub fn parse_stages(list: &str) -> Result<Vec<Stage>> {
    let mut stages = Vec::new();
    for name in list.split(',') {
        let name = name.trim();
        let stage = Stage::ALL
            .iter()
            .find(|s| s.name() == name)
            .copied()
            .ok_or_else(|| PipelineError::InvalidInput(format!("unknown stage: {name}")))?;
        if !stages.contains(&stage) {
            stages.push(stage);
        }
    }
    if stages.is_empty() {
        return Err(PipelineError::InvalidInput("empty stage list".to_string()));
    }
    Ok(stages)
}

/// Which stages to (re)build on this run.
#[derive(Debug, Clone)]
pub struct StageRequest {
    pub stages: Vec<Stage>,
    pub overwrite: bool,
}

impl StageRequest {
    fn selected(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }
}

/// Stage-3 artifact: the canonical entities plus the flat mention list the
/// relation extractor consumes.
#[derive(Debug, Serialize, Deserialize)]
pub struct EntityArtifact {
    pub entities: Vec<Entity>,
    pub mentions: Vec<Mention>,
}

/// Counts reported after a document run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub document_id: String,
    pub sections: usize,
    pub sentences: usize,
    pub entities: usize,
    pub relations: usize,
    pub views: usize,
}

/// Runs the six extraction stages for one document.
pub struct DocumentPipeline {
    config: PipelineConfig,
    out_dir: PathBuf,
}

impl DocumentPipeline {
    pub fn new(config: PipelineConfig, out_dir: PathBuf) -> Self {
        Self { config, out_dir }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn run_document(
        &self,
        input: &DocumentInput,
        request: &StageRequest,
    ) -> Result<RunSummary> {
        let dir = self.out_dir.join(&input.document_id);
        fs::create_dir_all(&dir)?;

        let sections: Vec<RetainedSection> = self.stage(&dir, Stage::Sections, request, || {
            Ok(SectionFilter::new(self.config.filter.clone()).filter(&input.sections))
        })?;
        let document_text = reconstruct_text(&sections);

        let sentences: Vec<Sentence> = self.stage(&dir, Stage::Sentences, request, || {
            Ok(SentenceSegmenter::new(self.config.segmenter.clone())
                .segment(&sections, &document_text))
        })?;

        let extracted: EntityArtifact = self.stage(&dir, Stage::Entities, request, || {
            let ensemble = EntityEnsemble::from_config(&self.config.extractor)?;
            let mut registry = EntityRegistry::new(&input.document_id);
            let mentions = ensemble.extract_document(&sentences, &mut registry);
            Ok(EntityArtifact {
                entities: registry.into_entities(),
                mentions,
            })
        })?;

        let relations: Vec<Relation> = self.stage(&dir, Stage::Relations, request, || {
            Ok(RelationExtractor::new(self.config.relations.clone())
                .extract(&sentences, &extracted.mentions))
        })?;

        let graph: DocumentGraph = self.stage(&dir, Stage::Graph, request, || {
            GraphAssembler::assemble(
                &input.document_id,
                extracted.entities.clone(),
                relations.clone(),
                &input.page_breaks,
            )
        })?;

        let views = if !request.selected(Stage::Views) {
            0
        } else if dir.join(Stage::Views.artifact()).exists() && !request.overwrite {
            info!(stage = "views", document_id = %input.document_id, "using cached artifacts");
            0
        } else {
            write_views(&dir, &graph, &self.config.reducer)?
        };

        Ok(RunSummary {
            document_id: input.document_id.clone(),
            sections: sections.len(),
            sentences: sentences.len(),
            entities: extracted.entities.len(),
            relations: relations.len(),
            views,
        })
    }

    /// Build or load one stage artifact.
    fn stage<T, F>(&self, dir: &Path, stage: Stage, request: &StageRequest, build: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        let path = dir.join(stage.artifact());
        let selected = request.selected(stage);
        if path.exists() && !(selected && request.overwrite) {
            info!(stage = stage.name(), path = %path.display(), "using cached artifact");
            return read_json(&path);
        }
        if !selected {
            return Err(PipelineError::MissingArtifact {
                stage: stage.name(),
                path: path.display().to_string(),
            });
        }
        let value = build()?;
        write_json(&path, &value)?;
        info!(stage = stage.name(), path = %path.display(), "artifact written");
        Ok(value)
    }
}

/// Derive and write the overview, section views, and section index for an
/// assembled graph. Returns the number of view artifacts written.
pub fn write_views(dir: &Path, graph: &DocumentGraph, config: &ReducerConfig) -> Result<usize> {
    let reducer = SubgraphReducer::new(graph, config);
    write_json(&dir.join("graph_overview.json"), &reducer.overview())?;
    write_json(&dir.join("section_index.json"), &reducer.section_index())?;
    let views = reducer.section_views();
    for (i, view) in views.iter().enumerate() {
        let slug = slugify(&view.name, config.slug_max_len);
        write_json(&dir.join(format!("section_{i:02}_{slug}.json")), view)?;
    }
    info!(
        document_id = %graph.document_id,
        sections = views.len(),
        "views written"
    );
    Ok(views.len() + 1)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_string_pretty(value)?;
    fs::write(path, data)?;
    Ok(())
}
