use api_types::LocalSsdConfig;

use crate::domain::errors::ValidationError;

/// Picks the active local SSD mode. A count of zero is the same as unset.
pub fn resolve_local_ssd(
    ephemeral_storage: Option<u32>,
    nvme_block: Option<u32>,
) -> Result<Option<LocalSsdConfig>, ValidationError> {
    let ephemeral = ephemeral_storage.filter(|count| *count > 0);
    let nvme = nvme_block.filter(|count| *count > 0);

    match (ephemeral, nvme) {
        (Some(ephemeral), Some(nvme_block)) => Err(ValidationError::LocalSsdConflict {
            ephemeral,
            nvme_block,
        }),
        (Some(local_ssd_count), None) => {
            Ok(Some(LocalSsdConfig::EphemeralStorage { local_ssd_count }))
        }
        (None, Some(local_ssd_count)) => Ok(Some(LocalSsdConfig::NvmeBlock { local_ssd_count })),
        (None, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn unset_counts_emit_nothing() {
        assert_eq!(resolve_local_ssd(None, None), Ok(None));
        assert_eq!(resolve_local_ssd(Some(0), Some(0)), Ok(None));
    }

    #[test]
    fn single_mode_is_selected() {
        assert_eq!(
            resolve_local_ssd(Some(16), None),
            Ok(Some(LocalSsdConfig::EphemeralStorage { local_ssd_count: 16 }))
        );
        assert_eq!(
            resolve_local_ssd(Some(0), Some(2)),
            Ok(Some(LocalSsdConfig::NvmeBlock { local_ssd_count: 2 }))
        );
    }

    #[test]
    fn both_modes_conflict() {
        assert_eq!(
            resolve_local_ssd(Some(1), Some(2)),
            Err(ValidationError::LocalSsdConflict {
                ephemeral: 1,
                nvme_block: 2
            })
        );
    }
}
