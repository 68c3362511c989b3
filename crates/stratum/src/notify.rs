use super::*;

#[derive(Debug, PartialEq, Clone)]
pub struct Notify {
    pub job_id: JobId,
    pub prevhash: PrevHash,
    pub coinb1: String,
    pub coinb2: String,
    pub merkle_branches: Vec<MerkleNode>,
    pub version: Version,
    pub nbits: Nbits,
    pub ntime: Ntime,
    pub clean_jobs: bool,
}

impl Serialize for Notify {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(9))?;
        seq.serialize_element(&self.job_id)?;
        seq.serialize_element(&self.prevhash)?;
        seq.serialize_element(&self.coinb1)?;
        seq.serialize_element(&self.coinb2)?;
        seq.serialize_element(&self.merkle_branches)?;
        seq.serialize_element(&self.version)?;
        seq.serialize_element(&self.nbits)?;
        seq.serialize_element(&self.ntime)?;
        seq.serialize_element(&self.clean_jobs)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Notify {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        type Fields = (
            JobId,
            PrevHash,
            String,
            String,
            Vec<MerkleNode>,
            Version,
            Nbits,
            Ntime,
        );

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Nine(
                JobId,
                PrevHash,
                String,
                String,
                Vec<MerkleNode>,
                Version,
                Nbits,
                Ntime,
                bool,
            ),
            Eight(Fields),
        }

        let ((job_id, prevhash, coinb1, coinb2, merkle_branches, version, nbits, ntime), clean_jobs) =
            match Raw::deserialize(deserializer)? {
                Raw::Nine(a, b, c, d, e, f, g, h, clean) => ((a, b, c, d, e, f, g, h), clean),
                Raw::Eight(fields) => (fields, false),
            };

        Ok(Notify {
            job_id,
            prevhash,
            coinb1,
            coinb2,
            merkle_branches,
            version,
            nbits,
            ntime,
            clean_jobs,
        })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, pretty_assertions::assert_eq};

    const PREVHASH: &str = "4d16b6f85af6e2198f44ae2a6de67f78487ae5611b77c6c0440b921e00000000";
    const BRANCH: &str = "8b1d7ef0c5a0b2a3b4c5d6e7f8091a2b3c4d5e6f708192a3b4c5d6e7f8091a2b";

    fn expected(clean_jobs: bool) -> Notify {
        Notify {
            job_id: "bf".into(),
            prevhash: PREVHASH.parse().unwrap(),
            coinb1: "01000000010000".into(),
            coinb2: "ffffffff00000000".into(),
            merkle_branches: vec![BRANCH.parse().unwrap()],
            version: "20000000".parse().unwrap(),
            nbits: "1d00ffff".parse().unwrap(),
            ntime: "504e86b9".parse().unwrap(),
            clean_jobs,
        }
    }

    #[test]
    fn nine_params() {
        let json = format!(
            r#"["bf","{PREVHASH}","01000000010000","ffffffff00000000",["{BRANCH}"],"20000000","1d00ffff","504e86b9",true]"#
        );
        let notify = serde_json::from_str::<Notify>(&json).unwrap();
        assert_eq!(notify, expected(true));

        let lhs: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(serde_json::to_value(&notify).unwrap(), lhs);
    }

    #[test]
    fn missing_clean_flag_defaults_to_false() {
        let json = format!(
            r#"["bf","{PREVHASH}","01000000010000","ffffffff00000000",["{BRANCH}"],"20000000","1d00ffff","504e86b9"]"#
        );
        assert_eq!(serde_json::from_str::<Notify>(&json).unwrap(), expected(false));
    }

    #[test]
    fn rejects_malformed() {
        assert!(serde_json::from_str::<Notify>(r#"["bf"]"#).is_err());
        let bad_branch = format!(
            r#"["bf","{PREVHASH}","01","02",["zz"],"20000000","1d00ffff","504e86b9",false]"#
        );
        assert!(serde_json::from_str::<Notify>(&bad_branch).is_err());
    }
}
