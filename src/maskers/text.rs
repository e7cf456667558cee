//! Text masker: hidden tokens are replaced by a mask token or removed.
//!
//! Features are the non-special tokens of the tokenized text. Special tokens
//! (sequence boundaries, padding) are always kept. Word-continuation pieces
//! can be grouped with the token that starts their word so a word is hidden
//! as a unit.

use crate::core::constants::DEFAULT_MASK_TOKEN;
use crate::core::error::{Result, ShapError};
use crate::core::traits::Tokenizer;
use crate::core::types::{Instance, TokenId};
use crate::maskers::partition::FeatureMask;
use crate::maskers::MaskingContext;

use std::sync::Arc;

/// How hidden tokens are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskToken {
    /// Text encoded with the tokenizer (special tokens stripped)
    Text(String),
    /// Explicit token id
    Id(TokenId),
    /// Drop hidden tokens entirely
    Remove,
}

/// Token replacement masker.
#[derive(Debug, Clone)]
pub struct TextMasker {
    tokenizer: Arc<dyn Tokenizer>,
    mask_token: MaskToken,
    mask_ids: Vec<TokenId>,
    collapse_mask_token: bool,
    group_subwords: bool,
}

impl TextMasker {
    /// Masker rendering hidden tokens as `mask_token`.
    ///
    /// `None` uses the tokenizer's own mask token, falling back to `"..."`.
    /// Fails with a configuration error when the mask token cannot be
    /// expressed in the tokenizer's vocabulary.
    pub fn new(tokenizer: Arc<dyn Tokenizer>, mask_token: Option<&str>) -> Result<Self> {
        let mask_token = match (mask_token, tokenizer.mask_token_id()) {
            (Some(text), _) => MaskToken::Text(text.to_string()),
            (None, Some(id)) => MaskToken::Id(id),
            (None, None) => MaskToken::Text(DEFAULT_MASK_TOKEN.to_string()),
        };
        Self::with_mask_token(tokenizer, mask_token)
    }

    /// Masker with an explicit mask token setting.
    pub fn with_mask_token(tokenizer: Arc<dyn Tokenizer>, mask_token: MaskToken) -> Result<Self> {
        let vocab = tokenizer.vocab_size();
        let mask_ids = match &mask_token {
            MaskToken::Text(text) => {
                let ids: Vec<TokenId> = tokenizer
                    .encode(text)?
                    .into_iter()
                    .filter(|&id| !tokenizer.is_special(id))
                    .collect();
                if ids.is_empty() {
                    return Err(ShapError::config(format!(
                        "mask token '{}' encodes to no tokens",
                        text
                    )));
                }
                ids
            }
            MaskToken::Id(id) => vec![*id],
            MaskToken::Remove => Vec::new(),
        };
        if let Some(&bad) = mask_ids.iter().find(|&&id| id as usize >= vocab) {
            return Err(ShapError::config(format!(
                "mask token id {} is outside the tokenizer vocabulary of {}",
                bad, vocab
            )));
        }
        Ok(TextMasker {
            tokenizer,
            mask_token,
            mask_ids,
            collapse_mask_token: false,
            group_subwords: false,
        })
    }

    /// Render a run of consecutive hidden groups as a single mask token.
    pub fn collapse_mask_token(mut self, collapse: bool) -> Self {
        self.collapse_mask_token = collapse;
        self
    }

    /// Hide word-continuation pieces together with their word.
    pub fn group_subwords(mut self, group: bool) -> Self {
        self.group_subwords = group;
        self
    }

    /// Tokenizer in use.
    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    /// Configured mask token.
    pub fn mask_token(&self) -> &MaskToken {
        &self.mask_token
    }

    /// Vocabulary size of the tokenizer.
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.vocab_size()
    }

    pub(crate) fn prepare(&self, instance: &Instance) -> Result<MaskingContext> {
        Ok(MaskingContext {
            tokens: Some(self.tokens_of(instance)?),
            ..MaskingContext::default()
        })
    }

    fn tokens_of(&self, instance: &Instance) -> Result<Vec<TokenId>> {
        match instance {
            Instance::Text(text) => self.tokenizer.encode(text),
            Instance::Tokens(tokens) => Ok(tokens.clone()),
            other => Err(ShapError::shape(format!(
                "text masker cannot mask a {} instance",
                other.variant_name()
            ))),
        }
    }

    fn cached_tokens(&self, instance: &Instance, ctx: &MaskingContext) -> Result<Vec<TokenId>> {
        match &ctx.tokens {
            Some(tokens) => Ok(tokens.clone()),
            None => self.tokens_of(instance),
        }
    }

    /// Token positions of each feature group.
    fn groups(&self, tokens: &[TokenId]) -> Vec<Vec<usize>> {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut previous_was_feature = false;
        for (pos, &token) in tokens.iter().enumerate() {
            if self.tokenizer.is_special(token) {
                previous_was_feature = false;
                continue;
            }
            let joins_previous = self.group_subwords
                && previous_was_feature
                && self.tokenizer.is_continuation(token);
            match groups.last_mut() {
                Some(group) if joins_previous => group.push(pos),
                _ => groups.push(vec![pos]),
            }
            previous_was_feature = true;
        }
        groups
    }

    pub(crate) fn num_groups_for(&self, instance: &Instance, ctx: &MaskingContext) -> Result<usize> {
        let tokens = self.cached_tokens(instance, ctx)?;
        Ok(self.groups(&tokens).len())
    }

    pub(crate) fn group_names(&self, instance: &Instance, ctx: &MaskingContext) -> Result<Vec<String>> {
        let tokens = self.cached_tokens(instance, ctx)?;
        self.groups(&tokens)
            .iter()
            .map(|group| {
                let ids: Vec<TokenId> = group.iter().map(|&p| tokens[p]).collect();
                self.tokenizer.decode(&ids)
            })
            .collect()
    }

    pub(crate) fn mask(
        &self,
        instance: &Instance,
        mask: &FeatureMask,
        ctx: &MaskingContext,
    ) -> Result<Vec<Instance>> {
        let tokens = self.cached_tokens(instance, ctx)?;
        let groups = self.groups(&tokens);
        mask.check_len(groups.len())?;

        // Group index of every feature position; None for special tokens
        let mut owner: Vec<Option<usize>> = vec![None; tokens.len()];
        for (g, group) in groups.iter().enumerate() {
            for &pos in group {
                owner[pos] = Some(g);
            }
        }

        let mut out = Vec::with_capacity(tokens.len());
        let mut last_hidden_group: Option<usize> = None;
        for (pos, &token) in tokens.iter().enumerate() {
            match owner[pos] {
                Some(g) if !mask.is_kept(g) => {
                    let continues_group = last_hidden_group == Some(g);
                    let continues_run = self.collapse_mask_token
                        && last_hidden_group.map_or(false, |prev| prev + 1 == g);
                    if !continues_group && !continues_run {
                        out.extend_from_slice(&self.mask_ids);
                    }
                    last_hidden_group = Some(g);
                }
                _ => {
                    out.push(token);
                    last_hidden_group = None;
                }
            }
        }
        Ok(vec![Instance::Tokens(out)])
    }
}
